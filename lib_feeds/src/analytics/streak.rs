/// Counts how many entries at the end of `items` satisfy `pred`, stopping at
/// the first one (scanning backwards) that does not.
///
/// `items` must already be in chronological order.
pub fn trailing_streak<T>(items: &[T], pred: impl Fn(&T) -> bool) -> usize {
    items.iter().rev().take_while(|item| pred(item)).count()
}
