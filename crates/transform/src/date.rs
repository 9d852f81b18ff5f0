use crate::{with_collision_retry, TransformCtx, TransformError};
use chrono::{Datelike, Duration, NaiveDate};
use maskvault_detect::{DateOrder, DateTemplate, DetectorParams};
use maskvault_fpe::Alphabet as FpeAlphabet;

/// Shifts a date by an FPE-derived offset within a bounded window (±20
/// years), clamping away from a nonexistent Feb-29 landing, and re-renders
/// it under the detected template (spec §4.7).
pub fn transform(ctx: &TransformCtx, value: &str, params: &DetectorParams) -> Result<String, TransformError> {
    let DetectorParams::Date { template } = params else {
        return Err(TransformError::FormatUnparseable("date transformer requires a detected date template".into()));
    };

    let original_date = parse(value, template)?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("1970-01-01 is a valid date");
    let days_since_epoch = (original_date - epoch).num_days();

    let tweak_base = format!("{}:date:{:?}:{}", ctx.column, template.order, template.separator).into_bytes();
    const BOUND_DAYS: i64 = 20 * 365;

    with_collision_retry(ctx, value, |attempt| {
        let mut tweak = tweak_base.clone();
        tweak.push(attempt);

        let alphabet = FpeAlphabet::digits();
        let padded = format!("{:010}", days_since_epoch.rem_euclid(10_000_000_000));
        let block = alphabet.encode(&padded).map_err(TransformError::Fpe)?;
        let ct = maskvault_fpe::fpe_encrypt(ctx.column_key, &tweak, &alphabet, &block);
        let shifted_raw: i64 = alphabet.decode(&ct).parse().unwrap_or(0);
        let offset = (shifted_raw % (2 * BOUND_DAYS)) - BOUND_DAYS;

        let mut new_date = original_date + Duration::days(offset);
        if new_date.month() == 2 && new_date.day() == 29 && !is_leap_year(new_date.year()) {
            new_date += Duration::days(1);
        }
        Ok(format_date(new_date, template))
    })
}

fn parse(value: &str, template: &DateTemplate) -> Result<NaiveDate, TransformError> {
    let parts: Vec<&str> = value.split(template.separator).collect();
    if parts.len() != 3 {
        return Err(TransformError::FormatUnparseable(value.to_string()));
    }
    let unparseable = || TransformError::FormatUnparseable(value.to_string());
    let a: i32 = parts[0].parse().map_err(|_| unparseable())?;
    let b: u32 = parts[1].parse().map_err(|_| unparseable())?;
    let c: u32 = parts[2].parse().map_err(|_| unparseable())?;

    let (y, m, d) = match template.order {
        DateOrder::Ymd => (a, b, c),
        DateOrder::Dmy => (c, b, a as u32),
        DateOrder::Mdy => (c, a as u32, b),
    };
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(unparseable)
}

fn format_date(date: NaiveDate, template: &DateTemplate) -> String {
    let (y, m, d) = (date.year(), date.month(), date.day());
    let sep = template.separator;
    match template.order {
        DateOrder::Ymd => format!("{y:04}{sep}{m:02}{sep}{d:02}"),
        DateOrder::Dmy => format!("{d:02}{sep}{m:02}{sep}{y:04}"),
        DateOrder::Mdy => format!("{m:02}{sep}{d:02}{sep}{y:04}"),
    }
}

fn is_leap_year(y: i32) -> bool {
    NaiveDate::from_ymd_opt(y, 2, 29).is_some()
}
