//! 时长格式化（"3 min 12 sec"、"1.1 sec"、"2 days 4 hr"）

use chrono::Duration;

const ONE_SECOND_MS: i64 = 1000;
const ONE_MINUTE_MS: i64 = 60 * ONE_SECOND_MS;
const ONE_HOUR_MS: i64 = 60 * ONE_MINUTE_MS;
const ONE_DAY_MS: i64 = 24 * ONE_HOUR_MS;
const ONE_MONTH_MS: i64 = 30 * ONE_DAY_MS;
const ONE_YEAR_MS: i64 = 365 * ONE_DAY_MS;

/// 用最大的两个单位表示时长。
///
/// 大单位 ≥ 10 时省略小单位；一分钟以内，10 秒以下保留一位小数，
/// 1 秒以下保留两位小数，100 毫秒以下用 ms。负时长按 0 处理。
pub fn format_time_span(span: Duration) -> String {
    let mut rest = span.num_milliseconds().max(0);

    let years = rest / ONE_YEAR_MS;
    rest %= ONE_YEAR_MS;
    let months = rest / ONE_MONTH_MS;
    rest %= ONE_MONTH_MS;
    let days = rest / ONE_DAY_MS;
    rest %= ONE_DAY_MS;
    let hours = rest / ONE_HOUR_MS;
    rest %= ONE_HOUR_MS;
    let minutes = rest / ONE_MINUTE_MS;
    rest %= ONE_MINUTE_MS;
    let seconds = rest / ONE_SECOND_MS;
    let millis = rest % ONE_SECOND_MS;

    if years > 0 {
        two_units(years, format!("{} yr", years), format!("{} mo", months))
    } else if months > 0 {
        two_units(months, format!("{} mo", months), day_label(days))
    } else if days > 0 {
        two_units(days, day_label(days), format!("{} hr", hours))
    } else if hours > 0 {
        two_units(hours, format!("{} hr", hours), format!("{} min", minutes))
    } else if minutes > 0 {
        two_units(minutes, format!("{} min", minutes), format!("{} sec", seconds))
    } else if seconds >= 10 {
        format!("{} sec", seconds)
    } else if seconds >= 1 {
        let value = seconds as f64 + (millis / 100) as f64 / 10.0;
        format!("{} sec", trim_fraction(value))
    } else if millis >= 100 {
        let value = (millis / 10) as f64 / 100.0;
        format!("{} sec", trim_fraction(value))
    } else {
        format!("{} ms", millis)
    }
}

fn two_units(big: i64, big_label: String, small_label: String) -> String {
    if big < 10 {
        format!("{} {}", big_label, small_label)
    } else {
        big_label
    }
}

fn day_label(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

fn trim_fraction(value: f64) -> String {
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
