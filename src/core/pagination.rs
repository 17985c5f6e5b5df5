use crate::models::{PageItem, PaginationModel};

/// 当前页两侧显示的页数
const DELTA: usize = 2;

/// 生成带省略号的分页序列
///
/// 总是包含第一页和最后一页；当前页两侧 `DELTA` 页以内的页码保留；
/// 相邻保留页相差 2 时补上中间页码，相差更多时插入一个省略号。
/// `total_pages == 0` 返回空序列，`total_pages == 1` 返回 `[1]`。
pub fn pagination_range(current_page: usize, total_pages: usize) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }

    let mut kept = vec![1];
    let low = current_page.saturating_sub(DELTA).max(2);
    let high = current_page.saturating_add(DELTA).min(total_pages.saturating_sub(1));
    kept.extend(low..=high);
    if total_pages > 1 {
        kept.push(total_pages);
    }

    let mut items = Vec::with_capacity(kept.len() + 2);
    let mut last: Option<usize> = None;
    for page in kept {
        if let Some(prev) = last {
            match page - prev {
                2 => items.push(PageItem::Number(prev + 1)),
                1 => {}
                _ => items.push(PageItem::Ellipsis),
            }
        }
        items.push(PageItem::Number(page));
        last = Some(page);
    }
    items
}

/// 分页 UI 模型：页码序列加上一页/下一页
pub fn pagination_model(current_page: usize, total_pages: usize) -> PaginationModel {
    let current = current_page.max(1);
    PaginationModel {
        current,
        total_pages,
        items: pagination_range(current, total_pages),
        prev: (current > 1).then(|| current - 1),
        next: (current < total_pages).then(|| current + 1),
    }
}

/// 总页数 = ceil(total / per_page)
pub fn total_pages(total_count: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    (total_count + per_page - 1) / per_page
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::{Ellipsis, Number};

    fn numbers(items: &[PageItem]) -> Vec<usize> {
        items
            .iter()
            .filter_map(|item| match item {
                Number(n) => Some(*n),
                Ellipsis => None,
            })
            .collect()
    }

    #[test]
    fn test_middle_page() {
        let range = pagination_range(5, 10);
        assert_eq!(
            range,
            vec![
                Number(1),
                Number(2),
                Number(3),
                Number(4),
                Number(5),
                Number(6),
                Number(7),
                Ellipsis,
                Number(10)
            ]
        );
    }

    #[test]
    fn test_ellipsis_on_both_sides() {
        let range = pagination_range(10, 20);
        assert_eq!(
            range,
            vec![
                Number(1),
                Ellipsis,
                Number(8),
                Number(9),
                Number(10),
                Number(11),
                Number(12),
                Ellipsis,
                Number(20)
            ]
        );
    }

    #[test]
    fn test_first_and_last_page() {
        assert_eq!(
            pagination_range(1, 10),
            vec![Number(1), Number(2), Number(3), Ellipsis, Number(10)]
        );
        assert_eq!(
            pagination_range(10, 10),
            vec![Number(1), Ellipsis, Number(8), Number(9), Number(10)]
        );
    }

    #[test]
    fn test_degenerate_totals() {
        assert_eq!(pagination_range(1, 0), Vec::<PageItem>::new());
        assert_eq!(pagination_range(1, 1), vec![Number(1)]);
        assert_eq!(pagination_range(3, 1), vec![Number(1)]);
        assert_eq!(pagination_range(1, 2), vec![Number(1), Number(2)]);
    }

    #[test]
    fn test_out_of_range_current_page() {
        assert_eq!(pagination_range(50, 5), vec![Number(1), Ellipsis, Number(5)]);
    }

    #[test]
    fn test_no_duplicates_and_sorted() {
        for total in 0..15 {
            for current in 1..=total.max(1) {
                let pages = numbers(&pagination_range(current, total));
                let mut sorted = pages.clone();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(pages, sorted, "current={} total={}", current, total);
            }
        }
    }

    #[test]
    fn test_model_prev_next() {
        let model = pagination_model(1, 3);
        assert_eq!(model.prev, None);
        assert_eq!(model.next, Some(2));

        let model = pagination_model(3, 3);
        assert_eq!(model.prev, Some(2));
        assert_eq!(model.next, None);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(5, 2), 3);
        assert_eq!(total_pages(4, 2), 2);
        assert_eq!(total_pages(0, 6), 0);
    }
}
