//! Named stream periods and flow-rate calculation for "amount per period".

use crate::coin::Coin;
use crate::decimal::flow_rate_for;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Period used to express how long a deposit should last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamPeriod {
    Unspecified,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    /// 365 / 12 days.
    Month,
    Year,
}

impl StreamPeriod {
    /// Length of one period in seconds. `Unspecified` counts as one second.
    pub fn seconds(&self) -> u64 {
        match self {
            StreamPeriod::Unspecified | StreamPeriod::Second => 1,
            StreamPeriod::Minute => 60,
            StreamPeriod::Hour => 3_600,
            StreamPeriod::Day => 86_400,
            StreamPeriod::Week => 604_800,
            StreamPeriod::Month => 2_628_000,
            StreamPeriod::Year => 31_536_000,
        }
    }
}

impl FromStr for StreamPeriod {
    type Err = std::convert::Infallible;

    /// Unknown names parse as `Unspecified`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim() {
            "Second" | "second" | "sec" => StreamPeriod::Second,
            "Minute" | "minute" | "min" => StreamPeriod::Minute,
            "Hour" | "hour" => StreamPeriod::Hour,
            "Day" | "day" => StreamPeriod::Day,
            "Week" | "week" => StreamPeriod::Week,
            "Month" | "month" | "mon" => StreamPeriod::Month,
            "Year" | "year" => StreamPeriod::Year,
            _ => StreamPeriod::Unspecified,
        })
    }
}

/// Flow rate that spends `coin` over `count` periods.
///
/// Returns `(total_seconds, flow_rate)`. The rate is truncated, so the
/// deposit usually lasts slightly longer than requested. A zero coin or a
/// zero total duration yields a zero rate.
pub fn flow_rate_for_period(coin: &Coin, period: StreamPeriod, count: u64) -> (u64, i64) {
    let total_seconds = period.seconds().saturating_mul(count);
    if coin.is_zero() || total_seconds == 0 {
        return (total_seconds, 0);
    }
    (total_seconds, flow_rate_for(coin.amount, total_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(s: &str) -> StreamPeriod {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_period_names() {
        assert_eq!(period("sec"), StreamPeriod::Second);
        assert_eq!(period("Minute"), StreamPeriod::Minute);
        assert_eq!(period("min"), StreamPeriod::Minute);
        assert_eq!(period("hour"), StreamPeriod::Hour);
        assert_eq!(period("Day"), StreamPeriod::Day);
        assert_eq!(period("week"), StreamPeriod::Week);
        assert_eq!(period("mon"), StreamPeriod::Month);
        assert_eq!(period("Year"), StreamPeriod::Year);
        assert_eq!(period("kwbefi"), StreamPeriod::Unspecified);
    }

    #[test]
    fn test_flow_rate_for_period() {
        let cases = [
            (1000u128, StreamPeriod::Second, 1u64, 1u64, 1000i64),
            (1000, StreamPeriod::Minute, 1, 60, 16),
            (23_423_423, StreamPeriod::Month, 1, 2_628_000, 8),
            (23_467_645_081_223_423, StreamPeriod::Month, 2, 5_256_000, 4_464_924_863),
            (23_467_645_081_223_423, StreamPeriod::Year, 1, 31_536_000, 744_154_143),
            (77_000_000_000, StreamPeriod::Month, 1, 2_628_000, 29_299),
            (4_584_000_000_000, StreamPeriod::Month, 1, 2_628_000, 1_744_292),
        ];

        for (amount, period, count, expected_seconds, expected_rate) in cases {
            let coin = Coin::new("nund", amount);
            let (seconds, rate) = flow_rate_for_period(&coin, period, count);
            assert_eq!(seconds, expected_seconds, "duration for {amount}");
            assert_eq!(rate, expected_rate, "flow rate for {amount}");
        }
    }

    #[test]
    fn test_zero_inputs_give_zero_rate() {
        let (seconds, rate) = flow_rate_for_period(&Coin::zero("nund"), StreamPeriod::Day, 1);
        assert_eq!((seconds, rate), (86_400, 0));

        let (seconds, rate) = flow_rate_for_period(&Coin::new("nund", 10), StreamPeriod::Day, 0);
        assert_eq!((seconds, rate), (0, 0));
    }
}
