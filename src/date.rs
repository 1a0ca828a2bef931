//! HTTP-date パース (RFC 9110 Section 5.6.7)
//!
//! ## 概要
//!
//! HTTP-date のパースと生成、Unix 時刻との相互変換を提供します。
//! Cookie の `Expires` 属性向けに、タイムゾーン `UTC` も受け付ける緩いパースも持ちます。
//!
//! ## 使い方
//!
//! ```rust
//! use http11_toolkit::date::HttpDate;
//!
//! // IMF-fixdate 形式のパース
//! let date = HttpDate::parse("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
//! assert_eq!(date.year(), 1994);
//! assert_eq!(date.to_unix_time(), 784111777);
//!
//! // HTTP-date 形式で出力
//! assert_eq!(date.to_string(), "Sun, 06 Nov 1994 08:49:37 GMT");
//!
//! // Cookie でよく使われる形式
//! let expires = HttpDate::parse_lenient("Sun, 06-Nov-1994 08:49:37 UTC").unwrap();
//! assert_eq!(expires, date);
//! ```

use core::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// HTTP-date パースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// 空の日付
    Empty,
    /// 不正な形式
    InvalidFormat,
    /// 不正な曜日
    InvalidDayName,
    /// 不正な日
    InvalidDay,
    /// 不正な月
    InvalidMonth,
    /// 不正な年
    InvalidYear,
    /// 不正な時
    InvalidHour,
    /// 不正な分
    InvalidMinute,
    /// 不正な秒
    InvalidSecond,
    /// GMT ではない
    NotGmt,
}

impl fmt::Display for DateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateError::Empty => write!(f, "empty date"),
            DateError::InvalidFormat => write!(f, "invalid date format"),
            DateError::InvalidDayName => write!(f, "invalid day name"),
            DateError::InvalidDay => write!(f, "invalid day"),
            DateError::InvalidMonth => write!(f, "invalid month"),
            DateError::InvalidYear => write!(f, "invalid year"),
            DateError::InvalidHour => write!(f, "invalid hour"),
            DateError::InvalidMinute => write!(f, "invalid minute"),
            DateError::InvalidSecond => write!(f, "invalid second"),
            DateError::NotGmt => write!(f, "timezone is not GMT"),
        }
    }
}

impl std::error::Error for DateError {}

/// 曜日
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    /// 短い形式の曜日名を取得
    pub fn short_name(&self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sun",
            DayOfWeek::Monday => "Mon",
            DayOfWeek::Tuesday => "Tue",
            DayOfWeek::Wednesday => "Wed",
            DayOfWeek::Thursday => "Thu",
            DayOfWeek::Friday => "Fri",
            DayOfWeek::Saturday => "Sat",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "Sun" | "Sunday" => Some(DayOfWeek::Sunday),
            "Mon" | "Monday" => Some(DayOfWeek::Monday),
            "Tue" | "Tuesday" => Some(DayOfWeek::Tuesday),
            "Wed" | "Wednesday" => Some(DayOfWeek::Wednesday),
            "Thu" | "Thursday" => Some(DayOfWeek::Thursday),
            "Fri" | "Friday" => Some(DayOfWeek::Friday),
            "Sat" | "Saturday" => Some(DayOfWeek::Saturday),
            _ => None,
        }
    }

    /// 1970-01-01 (木曜日) からの日数で曜日を求める
    fn from_days(days: i64) -> Self {
        match (days + 4).rem_euclid(7) {
            0 => DayOfWeek::Sunday,
            1 => DayOfWeek::Monday,
            2 => DayOfWeek::Tuesday,
            3 => DayOfWeek::Wednesday,
            4 => DayOfWeek::Thursday,
            5 => DayOfWeek::Friday,
            _ => DayOfWeek::Saturday,
        }
    }
}

/// パース済み HTTP-date
///
/// 3つの形式をパースできます:
/// - IMF-fixdate: Sun, 06 Nov 1994 08:49:37 GMT (推奨)
/// - RFC 850: Sunday, 06-Nov-94 08:49:37 GMT (廃止)
/// - ANSI C asctime: Sun Nov  6 08:49:37 1994 (廃止)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpDate {
    day_of_week: DayOfWeek,
    day: u8,
    month: u8,
    year: u16,
    hour: u8,
    minute: u8,
    second: u8,
}

impl HttpDate {
    /// HTTP-date 文字列をパース (タイムゾーンは GMT のみ)
    pub fn parse(input: &str) -> Result<Self, DateError> {
        parse_date(input, false)
    }

    /// Cookie の Expires 向けの緩いパース
    ///
    /// タイムゾーンとして `GMT` に加えて `UTC` と `+0000` を受け付ける。
    pub fn parse_lenient(input: &str) -> Result<Self, DateError> {
        parse_date(input, true)
    }

    /// 新しい HttpDate を作成
    pub fn new(
        day_of_week: DayOfWeek,
        day: u8,
        month: u8,
        year: u16,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, DateError> {
        if !(1..=12).contains(&month) {
            return Err(DateError::InvalidMonth);
        }
        if year < 1 {
            return Err(DateError::InvalidYear);
        }
        if day < 1 || day > days_in_month(year, month) {
            return Err(DateError::InvalidDay);
        }
        if hour > 23 {
            return Err(DateError::InvalidHour);
        }
        if minute > 59 {
            return Err(DateError::InvalidMinute);
        }
        if second > 60 {
            return Err(DateError::InvalidSecond);
        }

        Ok(HttpDate {
            day_of_week,
            day,
            month,
            year,
            hour,
            minute,
            second,
        })
    }

    /// Unix 時刻 (秒) から作成
    pub fn from_unix_time(secs: i64) -> Self {
        let days = secs.div_euclid(86_400);
        let secs_of_day = secs.rem_euclid(86_400);
        let (year, month, day) = civil_from_days(days);
        HttpDate {
            day_of_week: DayOfWeek::from_days(days),
            day,
            month,
            year: year.clamp(1, u16::MAX as i64) as u16,
            hour: (secs_of_day / 3600) as u8,
            minute: (secs_of_day % 3600 / 60) as u8,
            second: (secs_of_day % 60) as u8,
        }
    }

    /// `SystemTime` から作成
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = match time.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        };
        Self::from_unix_time(secs)
    }

    /// 現在時刻
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Unix 時刻 (秒) に変換
    ///
    /// うるう秒 (60 秒) は次の分の 0 秒として扱う。
    pub fn to_unix_time(&self) -> i64 {
        let days = days_from_civil(self.year as i64, self.month, self.day);
        days * 86_400 + self.hour as i64 * 3600 + self.minute as i64 * 60 + self.second as i64
    }

    /// `SystemTime` に変換
    pub fn to_system_time(&self) -> SystemTime {
        let secs = self.to_unix_time();
        if secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(secs as u64)
        } else {
            UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
        }
    }

    /// 曜日を取得
    pub fn day_of_week(&self) -> DayOfWeek {
        self.day_of_week
    }

    /// 日を取得 (1-31)
    pub fn day(&self) -> u8 {
        self.day
    }

    /// 月を取得 (1-12)
    pub fn month(&self) -> u8 {
        self.month
    }

    /// 年を取得
    pub fn year(&self) -> u16 {
        self.year
    }

    /// 時を取得 (0-23)
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// 分を取得 (0-59)
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// 秒を取得 (0-60)
    pub fn second(&self) -> u8 {
        self.second
    }
}

impl fmt::Display for HttpDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IMF-fixdate 形式で出力
        write!(
            f,
            "{}, {:02} {} {:04} {:02}:{:02}:{:02} GMT",
            self.day_of_week.short_name(),
            self.day,
            month_name(self.month),
            self.year,
            self.hour,
            self.minute,
            self.second
        )
    }
}

fn parse_date(input: &str, lenient: bool) -> Result<HttpDate, DateError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DateError::Empty);
    }

    // カンマの位置で形式を判別
    if let Some(comma_pos) = input.find(',') {
        let day_name = &input[..comma_pos];
        let rest = input[comma_pos + 1..].trim_start();

        if rest.contains('-') && !rest.contains(" -") {
            parse_rfc850(day_name, rest, lenient)
        } else {
            parse_imf_fixdate(day_name, rest, lenient)
        }
    } else {
        parse_asctime(input)
    }
}

fn check_zone(zone: &str, lenient: bool) -> Result<(), DateError> {
    let ok = zone == "GMT" || (lenient && matches!(zone, "UTC" | "+0000" | "Z"));
    if ok { Ok(()) } else { Err(DateError::NotGmt) }
}

/// IMF-fixdate 形式をパース
/// 例: 06 Nov 1994 08:49:37 GMT
fn parse_imf_fixdate(day_name: &str, rest: &str, lenient: bool) -> Result<HttpDate, DateError> {
    let day_of_week = DayOfWeek::from_name(day_name).ok_or(DateError::InvalidDayName)?;

    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(DateError::InvalidFormat);
    }

    let day = parts[0].parse::<u8>().map_err(|_| DateError::InvalidDay)?;
    let month = parse_month(parts[1])?;
    let year = parts[2]
        .parse::<u16>()
        .map_err(|_| DateError::InvalidYear)?;
    let (hour, minute, second) = parse_time(parts[3])?;
    check_zone(parts[4], lenient)?;

    HttpDate::new(day_of_week, day, month, year, hour, minute, second)
}

/// RFC 850 形式をパース
/// 例: 06-Nov-94 08:49:37 GMT (4 桁年も許可)
fn parse_rfc850(day_name: &str, rest: &str, lenient: bool) -> Result<HttpDate, DateError> {
    let day_of_week = DayOfWeek::from_name(day_name).ok_or(DateError::InvalidDayName)?;

    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(DateError::InvalidFormat);
    }

    let date_parts: Vec<&str> = parts[0].split('-').collect();
    if date_parts.len() != 3 {
        return Err(DateError::InvalidFormat);
    }

    let day = date_parts[0]
        .parse::<u8>()
        .map_err(|_| DateError::InvalidDay)?;
    let month = parse_month(date_parts[1])?;
    let raw_year = date_parts[2]
        .parse::<u16>()
        .map_err(|_| DateError::InvalidYear)?;

    let year = if raw_year < 100 {
        interpret_two_digit_year(raw_year)
    } else {
        raw_year
    };

    let (hour, minute, second) = parse_time(parts[1])?;
    check_zone(parts[2], lenient)?;

    HttpDate::new(day_of_week, day, month, year, hour, minute, second)
}

/// ANSI C asctime 形式をパース
/// 例: Sun Nov  6 08:49:37 1994
fn parse_asctime(input: &str) -> Result<HttpDate, DateError> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(DateError::InvalidFormat);
    }

    let day_of_week = DayOfWeek::from_name(parts[0]).ok_or(DateError::InvalidDayName)?;
    let month = parse_month(parts[1])?;
    let day = parts[2].parse::<u8>().map_err(|_| DateError::InvalidDay)?;
    let (hour, minute, second) = parse_time(parts[3])?;
    let year = parts[4]
        .parse::<u16>()
        .map_err(|_| DateError::InvalidYear)?;

    HttpDate::new(day_of_week, day, month, year, hour, minute, second)
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn parse_month(s: &str) -> Result<u8, DateError> {
    MONTHS
        .iter()
        .position(|m| *m == s)
        .map(|i| i as u8 + 1)
        .ok_or(DateError::InvalidMonth)
}

fn month_name(month: u8) -> &'static str {
    (month as usize)
        .checked_sub(1)
        .and_then(|i| MONTHS.get(i))
        .copied()
        .unwrap_or("???")
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// 1970-01-01 からの日数を (年, 月, 日) に変換
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

/// (年, 月, 日) を 1970-01-01 からの日数に変換
fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year.rem_euclid(400);
    let month = month as i64;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(not(test))]
fn current_year() -> u16 {
    HttpDate::now().year()
}

#[cfg(test)]
thread_local! {
    static CURRENT_YEAR_FOR_TEST: std::cell::Cell<u16> = const { std::cell::Cell::new(2026) };
}

#[cfg(test)]
fn current_year() -> u16 {
    CURRENT_YEAR_FOR_TEST.with(|y| y.get())
}

#[cfg(test)]
fn set_current_year_for_test(year: u16) {
    CURRENT_YEAR_FOR_TEST.with(|y| y.set(year));
}

/// 2 桁年を RFC 9110 準拠で解釈する
///
/// 50 年以上未来に見える場合は、下 2 桁が同じ直近の過去の年として扱う。
fn interpret_two_digit_year(two_digit: u16) -> u16 {
    let current = current_year();
    let candidate = (current / 100) * 100 + two_digit;
    if candidate > current + 50 {
        candidate - 100
    } else {
        candidate
    }
}

/// 時刻をパース (HH:MM:SS)
fn parse_time(s: &str) -> Result<(u8, u8, u8), DateError> {
    let mut parts = s.split(':');
    let (Some(hour), Some(minute), Some(second), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DateError::InvalidFormat);
    };

    let hour = hour.parse::<u8>().map_err(|_| DateError::InvalidHour)?;
    let minute = minute.parse::<u8>().map_err(|_| DateError::InvalidMinute)?;
    let second = second.parse::<u8>().map_err(|_| DateError::InvalidSecond)?;

    if hour > 23 {
        return Err(DateError::InvalidHour);
    }
    if minute > 59 {
        return Err(DateError::InvalidMinute);
    }
    if second > 60 {
        return Err(DateError::InvalidSecond);
    }

    Ok((hour, minute, second))
}
