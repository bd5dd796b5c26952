//! Turns raw scraped text into typed values.
//!
//! Every extractor answers `None` when its pattern is missing or malformed.
//! A `None` means "unknown", callers must not read it as zero.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static WALLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)wallet:\s*(.*?)(?:BTC|$)").expect("Invalid wallet regex"));
static BTC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9][0-9,]*(?:\.[0-9]+)?)\s*BTC").expect("Invalid BTC amount regex"));
static USD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)").expect("Invalid USD amount regex"));
static INS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Ins:\s*([0-9]+)").expect("Invalid ins regex"));
static OUTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Outs:\s*([0-9]+)").expect("Invalid outs regex"));
static FILE_TS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{8}_[0-9]{6})").expect("Invalid filename timestamp regex"));

const FILE_TS_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Text after a `wallet:` marker, up to the `BTC` unit that starts the balance.
pub fn extract_wallet_name(address: &str) -> Option<String> {
    let name = WALLET_RE.captures(address)?.get(1)?.as_str().trim();
    (!name.is_empty()).then(|| name.to_string())
}

pub fn extract_btc_amount(balance: &str) -> Option<f64> {
    first_number(&BTC_RE, balance)
}

pub fn extract_usd_amount(balance: &str) -> Option<f64> {
    first_number(&USD_RE, balance)
}

/// `(ins, outs)`, each one independently optional.
pub fn extract_ins_outs(address: &str) -> (Option<i64>, Option<i64>) {
    (first_count(&INS_RE, address), first_count(&OUTS_RE, address))
}

/// Finds a `YYYYMMDD_HHMMSS` token anywhere in `name`.
pub fn extract_timestamp_from_filename(name: &str) -> Option<NaiveDateTime> {
    let token = FILE_TS_RE.captures(name)?.get(1)?.as_str();
    NaiveDateTime::parse_from_str(token, FILE_TS_FORMAT).ok()
}

/// Parses a cell holding only a count, like `"1,024"`.
pub fn parse_count(cell: &str) -> Option<i64> {
    let digits = strip_separators(cell.trim());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn first_number(re: &Regex, text: &str) -> Option<f64> {
    let raw = re.captures(text)?.get(1)?.as_str();
    strip_separators(raw).parse().ok()
}

fn first_count(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

#[inline]
fn strip_separators(raw: &str) -> String {
    raw.replace(',', "")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn btc_amount_strips_thousands_separators() {
        assert_eq!(extract_btc_amount("1,234.00 BTC"), Some(1234.0));
        assert_eq!(
            extract_btc_amount("248,597 BTC ($16,312,762,839)"),
            Some(248_597.0)
        );
        assert_eq!(extract_btc_amount("12BTC"), Some(12.0));
    }

    #[test]
    fn btc_amount_missing() {
        assert_eq!(extract_btc_amount("no amount here"), None);
        assert_eq!(extract_btc_amount(", BTC"), None);
        assert_eq!(extract_btc_amount(""), None);
    }

    #[test]
    fn usd_amount_follows_the_dollar_sign() {
        assert_eq!(
            extract_usd_amount("248,597 BTC ($16,312,762,839)"),
            Some(16_312_762_839.0)
        );
        assert_eq!(extract_usd_amount("$ 1,000.50"), Some(1000.5));
        assert_eq!(extract_usd_amount("248,597 BTC"), None);
    }

    #[test]
    fn ins_and_outs_are_independent() {
        assert_eq!(extract_ins_outs("Ins:5 Outs:3"), (Some(5), Some(3)));
        assert_eq!(extract_ins_outs("Ins:5"), (Some(5), None));
        assert_eq!(extract_ins_outs("Outs:12"), (None, Some(12)));
        assert_eq!(extract_ins_outs("34xp4vRoCGJym3xR7yCVPFHoCNxv4Twseo"), (None, None));
    }

    #[test]
    fn wallet_name_stops_before_the_unit() {
        assert_eq!(
            extract_wallet_name("34xp4vRoCGJym3xR7yCVPFHoCNxv4Twseo wallet: Binance-coldwallet BTC 248,597"),
            Some("Binance-coldwallet".to_string())
        );
        assert_eq!(
            extract_wallet_name("bc1qgdjqv0av3q56jvd82tkdjpy7gdp9ut8tlqmgrpmv24sq90ecnvqqjwvw97 wallet: Bitfinex-coldwallet"),
            Some("Bitfinex-coldwallet".to_string())
        );
        assert_eq!(
            extract_wallet_name("wallet: Bybit-BigCold 12 BTC"),
            Some("Bybit-BigCold 12".to_string())
        );
        assert_eq!(extract_wallet_name("wallet:   BTC"), None);
        assert_eq!(extract_wallet_name("1P5ZEDWTKTFGxQjZphgWPQUpe554WKDfHQ"), None);
    }

    #[test]
    fn only_ascii_digits_are_numbers() {
        // Arabic-Indic digits ahead of the real number must not shadow it.
        assert_eq!(extract_btc_amount("\u{0661}\u{0662} BTC, then 12 BTC"), Some(12.0));
        assert_eq!(extract_usd_amount("$\u{0665} or $7"), Some(7.0));
        assert_eq!(extract_ins_outs("Ins:\u{0663} Outs:4"), (None, Some(4)));
        assert_eq!(
            extract_timestamp_from_filename("\u{0662}0240115_093000 list_20240115_093000.csv"),
            NaiveDate::from_ymd_opt(2024, 1, 15).and_then(|d| d.and_hms_opt(9, 30, 0))
        );
    }

    #[test]
    fn timestamp_from_filename() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap();
        assert_eq!(
            extract_timestamp_from_filename("bitcoin_rich_list_20240115_093000.csv"),
            Some(expected)
        );
        assert_eq!(extract_timestamp_from_filename("bitcoin_rich_list.csv"), None);
        // Right layout, impossible date.
        assert_eq!(extract_timestamp_from_filename("list_20241345_093000.csv"), None);
    }

    #[test]
    fn count_cells() {
        assert_eq!(parse_count(" 1,024 "), Some(1024));
        assert_eq!(parse_count("7"), Some(7));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("n/a"), None);
        assert_eq!(parse_count("-3"), None);
    }
}
