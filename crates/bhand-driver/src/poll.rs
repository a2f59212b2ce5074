//! 有界轮询原语
//!
//! 控制周期内不允许阻塞等待：对一个非阻塞 getter 至多调用 `attempts` 次，
//! 遇到"暂无数据"立即停止，返回期间读到的最新值。积压的旧应答因此被一并清空。

/// 每个量每个周期的默认最大读取次数
pub const DEFAULT_POLL_ATTEMPTS: usize = 20;

/// 有界轮询
///
/// - `Ok(Some(v))`: 至少读到一个值，`v` 为最后读到的
/// - `Ok(None)`: 没有新值，调用方应保留上一次的遥测
/// - `Err(e)`: getter 返回的错误原样传出
///
/// ```rust
/// use bhand_driver::poll_bounded;
///
/// let mut backlog = vec![3, 2, 1];
/// let latest: Result<Option<i32>, ()> = poll_bounded(20, || Ok(backlog.pop()));
/// assert_eq!(latest, Ok(Some(3)));
/// ```
pub fn poll_bounded<T, E>(
    attempts: usize,
    mut getter: impl FnMut() -> Result<Option<T>, E>,
) -> Result<Option<T>, E> {
    let mut latest = None;
    for _ in 0..attempts {
        match getter()? {
            Some(value) => latest = Some(value),
            None => break,
        }
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_stops_at_first_miss() {
        let mut calls = 0;
        let result: Result<Option<u8>, ()> = poll_bounded(20, || {
            calls += 1;
            Ok(if calls <= 2 { Some(calls) } else { None })
        });
        assert_eq!(result, Ok(Some(2)));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_poll_respects_bound() {
        let mut calls = 0;
        let result: Result<Option<usize>, ()> = poll_bounded(DEFAULT_POLL_ATTEMPTS, || {
            calls += 1;
            Ok(Some(calls))
        });
        assert_eq!(result, Ok(Some(20)));
        assert_eq!(calls, 20);
    }

    #[test]
    fn test_poll_nothing_available() {
        let result: Result<Option<i32>, ()> = poll_bounded(20, || Ok(None));
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn test_poll_propagates_error() {
        let result: Result<Option<i32>, &str> = poll_bounded(20, || Err("bus off"));
        assert_eq!(result, Err("bus off"));
    }
}
