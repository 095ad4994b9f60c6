//! Finding and removing the dates embedded in dataset titles.
//!
//! Titles such as `ICA Armenia, 2017 - Drought Risk, 1981-2015` carry their
//! time periods in free text. Year ranges are taken first, then single dates
//! of varying precision around each remaining year, and finally the title is
//! tidied of the punctuation and words the dates leave behind.

use std::sync::LazyLock;

use chrono::{Datelike, Months, NaiveDate};
use regex::{Captures, Regex};
use tracing::info;

/// Inclusive start and end dates found in a title.
pub type DateRange = (NaiveDate, NaiveDate);

const PUNCTUATION_MINUS_BRACKETS: &str = r##"!"#$%&'*+,-./:;=?@\^_`|~"##;
const DATE_INTRO_WORDS: [&str; 5] = ["on", "at", "for", "of", "in"];
const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("unable to compile title date regex")
}

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"[12]\d\d\d"));
static YEAR_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"([12]\d\d\d)(/(\d{1,2}))?(-| & | and )([12]\d\d\d)"));
static YEAR_SLASH_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"([12]\d\d\d)([/-])(\d{1,2})"));
static EMPTY_BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"\s?\(\s*\)\s?"));
static WORD_RIGHT_BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(\s*)(\w{2,})\b\)"));

static COMPACT_DATE_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"^([12]\d{3})(\d{2})(\d{2})(?:\D|$)"));
static ISO_REST_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"^-(\d{1,2})-(\d{1,2})\b"));
static SLASH_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"^/(\d{1,2})\b"));
static DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    regex(&format!(r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?[\s-]+({MONTHS})\.?,?[\s-]+$"))
});
static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    regex(&format!(r"(?i)\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+$"))
});
static MONTH_BEFORE_RE: LazyLock<Regex> =
    LazyLock::new(|| regex(&format!(r"(?i)\b({MONTHS})\.?,?[\s-]+$")));
static MONTH_AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| regex(&format!(r"(?i)^[\s-]+({MONTHS})\b\.?")));
static NUMERIC_BEFORE_RE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b(\d{1,2})[/.-](\d{1,2})[/.-]$"));
static SHORT_NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(\d{1,2})/(\d{1,2})/(\d{2})\b"));
static UNIT_AFTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)^\s*(?:%|(?:kcal|cal|kg|km2|km|sq\s?km|mm|cm|m2|ha|hectares?|tonnes?|tons?|mt|litres?|liters?|percent|usd|dollars?)\b)")
});

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn year_range(start: i32, end: i32) -> Option<DateRange> {
    Some((
        NaiveDate::from_ymd_opt(start, 1, 1)?,
        NaiveDate::from_ymd_opt(end, 12, 31)?,
    ))
}

fn month_range(year: i32, month: u32) -> Option<DateRange> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((start, end))
}

fn day_range(year: i32, month: u32, day: u32) -> Option<DateRange> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some((date, date))
}

fn number<T: std::str::FromStr>(caps: &Captures, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

fn remove_end_characters<'a>(text: &'a str, characters: &str) -> &'a str {
    text.trim_end_matches(|c: char| characters.contains(c))
}

/// Removes `start..end` from `text`, dropping whitespace and punctuation left
/// dangling before it. Returns the new text and where the removed span was.
fn remove_span(text: &str, start: usize, end: usize) -> (String, usize) {
    let before = remove_end_characters(text[..start].trim_end(), PUNCTUATION_MINUS_BRACKETS).trim_end();
    let position = before.len();
    (format!("{before}{}", &text[end..]), position)
}

/// Removes `words` from the end of `text` where they appear as whole words.
fn remove_from_end(mut text: String, words: &[&str]) -> String {
    for word in words {
        let Some(cut) = text.len().checked_sub(word.len()) else {
            continue;
        };
        let ending = text.get(cut..).is_some_and(|end| end.eq_ignore_ascii_case(word));
        let whole_word = ending
            && text[..cut]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric());
        if whole_word {
            let newtext = text[..cut].trim_end().to_string();
            info!("Removing - from title: {text} -> {newtext}");
            text = newtext;
        }
    }
    text
}

/// Splits a year followed by a one or two digit number, eg. `2007/08`.
///
/// A number from 1 to 12 is taken as a month. A larger number is the end year
/// of a range within the same century, and a range going backwards marks the
/// first year as not being a year at all.
pub fn get_month_year_in_slash_range(
    first_year: &str,
    two_digits: Option<&str>,
    ignore_wrong_years: &mut Vec<i32>,
) -> Option<(i32, Option<u32>, Option<i32>)> {
    let year: i32 = first_year.parse().ok()?;
    if ignore_wrong_years.contains(&year) {
        return None;
    }
    let Some(two_digits) = two_digits else {
        return Some((year, None, None));
    };
    let value: u32 = two_digits.parse().ok()?;
    if (1..=12).contains(&value) {
        return Some((year, Some(value), None));
    }
    let second_year: i32 = format!("{}{two_digits}", &first_year[..2]).parse().ok()?;
    if second_year > year {
        Some((year, None, Some(second_year)))
    } else {
        ignore_wrong_years.push(year);
        None
    }
}

/// The date phrase around the year at `start..end` and the range it covers.
fn date_around_year(title: &str, start: usize, end: usize, year: i32) -> Option<(usize, usize, DateRange)> {
    let left = &title[..start];
    let right = &title[end..];

    if right.starts_with(|c: char| c.is_ascii_digit()) {
        let caps = COMPACT_DATE_RE.captures(&title[start..])?;
        let range = day_range(year, number(&caps, 2)?, number(&caps, 3)?)?;
        return Some((start, start + 8, range));
    }
    if let Some(caps) = ISO_REST_RE.captures(right) {
        if let Some(range) = day_range(year, number(&caps, 1)?, number(&caps, 2)?) {
            return Some((start, end + caps[0].len(), range));
        }
    }
    if let Some(caps) = SLASH_MONTH_RE.captures(right) {
        if let Some(range) = month_range(year, number(&caps, 1)?) {
            return Some((start, end + caps[0].len(), range));
        }
    }
    if let Some(caps) = DAY_MONTH_RE.captures(left) {
        let month = month_number(&caps[2])?;
        if let Some(range) = day_range(year, month, number(&caps, 1)?) {
            return Some((caps.get(0)?.start(), end, range));
        }
    }
    if let Some(caps) = MONTH_DAY_RE.captures(left) {
        let month = month_number(&caps[1])?;
        if let Some(range) = day_range(year, month, number(&caps, 2)?) {
            return Some((caps.get(0)?.start(), end, range));
        }
    }
    if let Some(caps) = MONTH_BEFORE_RE.captures(left) {
        let range = month_range(year, month_number(&caps[1])?)?;
        return Some((caps.get(0)?.start(), end, range));
    }
    if let Some(caps) = MONTH_AFTER_RE.captures(right) {
        let range = month_range(year, month_number(&caps[1])?)?;
        return Some((start, end + caps[0].len(), range));
    }
    if let Some(caps) = NUMERIC_BEFORE_RE.captures(left) {
        if let Some(range) = day_range(year, number(&caps, 2)?, number(&caps, 1)?) {
            return Some((caps.get(0)?.start(), end, range));
        }
    }
    Some((start, end, year_range(year, year)?))
}

/// Finds dates around each remaining year in `title`, appending their ranges
/// to `ranges` and returning the title without them.
///
/// Numbers followed by a unit (eg. `2100 kcal`) are added to
/// `ignore_wrong_years`. A lone short date such as `10/12/01` is also taken,
/// day first, unless it follows a `v` as in a version number.
pub fn fuzzy_match_dates_in_title(
    title: &str,
    ranges: &mut Vec<DateRange>,
    ignore_wrong_years: &mut Vec<i32>,
) -> String {
    for found in YEAR_RE.find_iter(title) {
        if UNIT_AFTER_RE.is_match(&title[found.end()..]) {
            if let Ok(year) = found.as_str().parse() {
                ignore_wrong_years.push(year);
            }
        }
    }

    let mut title = title.to_string();
    let mut search_from = 0;
    while let Some(found) = YEAR_RE.find_at(&title, search_from) {
        let (start, end) = (found.start(), found.end());
        search_from = end;
        let Ok(year) = found.as_str().parse::<i32>() else {
            continue;
        };
        let preceding = title[..start].chars().next_back();
        if ignore_wrong_years.contains(&year)
            || preceding.is_some_and(|c| c.is_ascii_digit() || c.eq_ignore_ascii_case(&'v'))
        {
            continue;
        }
        let Some((phrase_start, phrase_end, range)) = date_around_year(&title, start, end, year) else {
            continue;
        };
        ranges.push(range);
        let (newtitle, position) = remove_span(&title, phrase_start, phrase_end);
        info!("Removing date from title: {title} -> {newtitle}");
        title = newtitle;
        search_from = position;
    }

    let short_dates: Vec<_> = SHORT_NUMERIC_RE.captures_iter(&title).collect();
    if let [caps] = short_dates.as_slice() {
        let whole = caps.get(0);
        let after_v = whole
            .and_then(|m| title[..m.start()].chars().next_back())
            .is_some_and(|c| c.eq_ignore_ascii_case(&'v'));
        let range = number::<i32>(caps, 3)
            .and_then(|year| day_range(2000 + year, number(caps, 2)?, number(caps, 1)?));
        if let (Some(whole), Some(range), false) = (whole, range, after_v) {
            let (start, end) = (whole.start(), whole.end());
            ranges.push(range);
            let (newtitle, _) = remove_span(&title, start, end);
            info!("Removing date from title: {title} -> {newtitle}");
            return newtitle;
        }
    }
    title
}

/// Removes the dates from a title, returning the cleaned title and the sorted
/// date ranges found.
pub fn get_dates_from_title(title: &str) -> (String, Vec<DateRange>) {
    let mut ranges = Vec::new();
    let mut ignore_wrong_years = Vec::new();
    let mut title = title.to_string();

    let spans: Vec<(String, String, Option<String>, String)> = YEAR_RANGE_RE
        .captures_iter(&title)
        .map(|caps| {
            (
                caps[0].to_string(),
                caps[1].to_string(),
                caps.get(3).map(|m| m.as_str().to_string()),
                caps[5].to_string(),
            )
        })
        .collect();
    for (whole, first_year, two_digits, end_year) in spans {
        let Some((year, month, _)) =
            get_month_year_in_slash_range(&first_year, two_digits.as_deref(), &mut ignore_wrong_years)
        else {
            continue;
        };
        let start = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), 1);
        let end = end_year.parse().ok().and_then(|end| NaiveDate::from_ymd_opt(end, 12, 31));
        let (Some(start), Some(end), Some(index)) = (start, end, title.find(&whole)) else {
            continue;
        };
        ranges.push((start, end));
        let (newtitle, _) = remove_span(&title, index, index + whole.len());
        info!("Removing date range from title: {title} -> {newtitle}");
        title = newtitle;
    }

    let spans: Vec<(String, String, String)> = YEAR_SLASH_RE
        .captures_iter(&title)
        .map(|caps| (caps[0].to_string(), caps[1].to_string(), caps[3].to_string()))
        .collect();
    for (whole, first_year, two_digits) in spans {
        let Some((year, _, Some(second_year))) =
            get_month_year_in_slash_range(&first_year, Some(&two_digits), &mut ignore_wrong_years)
        else {
            continue;
        };
        let (Some(range), Some(index)) = (year_range(year, second_year), title.find(&whole)) else {
            continue;
        };
        ranges.push(range);
        let (newtitle, _) = remove_span(&title, index, index + whole.len());
        info!("Removing date range from title: {title} -> {newtitle}");
        title = newtitle;
    }

    title = fuzzy_match_dates_in_title(&title, &mut ranges, &mut ignore_wrong_years);

    let bracketed: Vec<(String, String)> = WORD_RIGHT_BRACKET_RE
        .captures_iter(&title)
        .map(|caps| (caps[0].to_string(), caps[2].to_string()))
        .collect();
    for (whole, word) in bracketed {
        if DATE_INTRO_WORDS.contains(&word.as_str()) {
            title = title.replace(&whole, ")");
        }
    }
    title = EMPTY_BRACKET_RE.replace_all(&title, " ").into_owned();
    let title = title
        .trim_end_matches(|c: char| c.is_whitespace() || PUNCTUATION_MINUS_BRACKETS.contains(c))
        .to_string();

    let mut words = vec!["as of"];
    words.extend(DATE_INTRO_WORDS);
    let title = remove_from_end(title, &words);

    ranges.sort();
    (title, ranges)
}

/// The years of a range, for logging.
pub fn describe(range: &DateRange) -> String {
    if range.0.year() == range.1.year() {
        range.0.year().to_string()
    } else {
        format!("{}-{}", range.0.year(), range.1.year())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn dates(title: &str) -> (String, Vec<DateRange>) {
        get_dates_from_title(title)
    }

    #[test]
    fn test_month_year_in_slash_range() {
        let mut ignore = Vec::new();
        assert_eq!(
            get_month_year_in_slash_range("2007", Some("08"), &mut ignore),
            Some((2007, Some(8), None))
        );
        assert_eq!(
            get_month_year_in_slash_range("2013", Some("14"), &mut ignore),
            Some((2013, None, Some(2014)))
        );
        assert_eq!(get_month_year_in_slash_range("2014", Some("13"), &mut ignore), None);
        assert_eq!(ignore, vec![2014]);
        assert_eq!(get_month_year_in_slash_range("2014", None, &mut ignore), None);
        assert_eq!(
            get_month_year_in_slash_range("2019", None, &mut ignore),
            Some((2019, None, None))
        );
    }

    #[test]
    fn test_fuzzy_match_dates_in_title() {
        let mut ranges = Vec::new();
        let mut ignore = Vec::new();
        let title = fuzzy_match_dates_in_title("Myanmar Town July 2019", &mut ranges, &mut ignore);
        assert_eq!(title, "Myanmar Town");
        assert_eq!(ranges, vec![(date(2019, 7, 1), date(2019, 7, 31))]);

        let mut ranges = Vec::new();
        let title = fuzzy_match_dates_in_title("Myanmar Town 2019 July", &mut ranges, &mut ignore);
        assert_eq!(title, "Myanmar Town");
        assert_eq!(ranges, vec![(date(2019, 7, 1), date(2019, 7, 31))]);
    }

    #[test]
    fn test_titles_without_dates() {
        for title in [
            "Myanmar Self Administered Regions Boundaries MIMU v9.2.1",
            "Ward boundaries Yangon City_mimu_v8_1",
            "Mon_State_Village_Tract_Boundaries",
            "Mon_State_Village_Tract_Boundaries 9999",
        ] {
            assert_eq!(dates(title), (title.to_string(), Vec::new()));
        }
    }

    #[test]
    fn test_years_in_title() {
        assert_eq!(
            dates("Formal Sector School Location Upper Myanmar (  2019   )"),
            (
                "Formal Sector School Location Upper Myanmar".to_string(),
                vec![(date(2019, 1, 1), date(2019, 12, 31))]
            )
        );
        assert_eq!(
            dates("ICA Armenia, 2017 - Drought Risk, 1981-2015"),
            (
                "ICA Armenia - Drought Risk".to_string(),
                vec![
                    (date(1981, 1, 1), date(2015, 12, 31)),
                    (date(2017, 1, 1), date(2017, 12, 31)),
                ]
            )
        );
        assert_eq!(
            dates("Kachin State and Sagaing Region 2002-2014 Forest Cover Change"),
            (
                "Kachin State and Sagaing Region Forest Cover Change".to_string(),
                vec![(date(2002, 1, 1), date(2014, 12, 31))]
            )
        );
        assert_eq!(
            dates("ICA Armenia, 2016 & 2017 - Land Degradation, 2001-2012"),
            (
                "ICA Armenia - Land Degradation".to_string(),
                vec![
                    (date(2001, 1, 1), date(2012, 12, 31)),
                    (date(2016, 1, 1), date(2017, 12, 31)),
                ]
            )
        );
        assert_eq!(
            dates("Crops production (2016) - Tajikistan Vulnerability & Resilience Atlas, 2019"),
            (
                "Crops production - Tajikistan Vulnerability & Resilience Atlas".to_string(),
                vec![
                    (date(2016, 1, 1), date(2016, 12, 31)),
                    (date(2019, 1, 1), date(2019, 12, 31)),
                ]
            )
        );
        assert_eq!(
            dates("Cambodia Flood Extent in 2011"),
            (
                "Cambodia Flood Extent".to_string(),
                vec![(date(2011, 1, 1), date(2011, 12, 31))]
            )
        );
    }

    #[test]
    fn test_units_are_not_years() {
        assert_eq!(
            dates("Access: Proportion of the population consuming less than 2100 kcal per day (average of 2011-2013), National Statistics Committee 2013"),
            (
                "Access: Proportion of the population consuming less than 2100 kcal per day (average), National Statistics Committee".to_string(),
                vec![
                    (date(2011, 1, 1), date(2013, 12, 31)),
                    (date(2013, 1, 1), date(2013, 12, 31)),
                ]
            )
        );
    }

    #[test]
    fn test_month_years_in_title() {
        assert_eq!(
            dates("Central African Republic, Bridges, January 2019"),
            (
                "Central African Republic, Bridges".to_string(),
                vec![(date(2019, 1, 1), date(2019, 1, 31))]
            )
        );
        assert_eq!(
            dates("Tanintharyi Region Land Cover - March 2016 (Original)"),
            (
                "Tanintharyi Region Land Cover (Original)".to_string(),
                vec![(date(2016, 3, 1), date(2016, 3, 31))]
            )
        );
        assert_eq!(
            dates("Myanmar Town 2019 July"),
            ("Myanmar Town".to_string(), vec![(date(2019, 7, 1), date(2019, 7, 31))])
        );
    }

    #[test]
    fn test_slash_ranges_in_title() {
        assert_eq!(
            dates("Afghanistan Food Insecurity by Province - ALCS 2013/14"),
            (
                "Afghanistan Food Insecurity by Province - ALCS".to_string(),
                vec![(date(2013, 1, 1), date(2014, 12, 31))]
            )
        );
        assert_eq!(
            dates("ALCS 2000/10"),
            ("ALCS".to_string(), vec![(date(2000, 10, 1), date(2000, 10, 31))])
        );
        assert_eq!(dates("ALCS 2014/13"), ("ALCS 2014/13".to_string(), Vec::new()));
        assert_eq!(
            dates("ICA Afghanistan, 2016 - Food Insecurity Risk, 2007/08-2014"),
            (
                "ICA Afghanistan - Food Insecurity Risk".to_string(),
                vec![
                    (date(2007, 8, 1), date(2014, 12, 31)),
                    (date(2016, 1, 1), date(2016, 12, 31)),
                ]
            )
        );
        assert_eq!(
            dates("Risk, 2020/19-2014"),
            ("Risk, 2020/19".to_string(), vec![(date(2014, 1, 1), date(2014, 12, 31))])
        );
    }

    #[test]
    fn test_days_in_title() {
        assert_eq!(
            dates("Afghanistan:District Accessibility for WFP and Partners Staff as of 05 May 2019"),
            (
                "Afghanistan:District Accessibility for WFP and Partners Staff".to_string(),
                vec![(date(2019, 5, 5), date(2019, 5, 5))]
            )
        );
        assert_eq!(
            dates("Location of partners as of Feb. 5, 2019"),
            ("Location of partners".to_string(), vec![(date(2019, 2, 5), date(2019, 2, 5))])
        );
        assert_eq!(
            dates("south sudan access constraints shp for 20200124"),
            (
                "south sudan access constraints shp".to_string(),
                vec![(date(2020, 1, 24), date(2020, 1, 24))]
            )
        );
        assert_eq!(
            dates("State_Village_Tract_Boundaries 10/12/01 lala"),
            (
                "State_Village_Tract_Boundaries lala".to_string(),
                vec![(date(2001, 12, 10), date(2001, 12, 10))]
            )
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&(date(2019, 1, 1), date(2019, 12, 31))), "2019");
        assert_eq!(describe(&(date(2001, 1, 1), date(2012, 12, 31))), "2001-2012");
    }
}
