//! Column decoding for PostgreSQL result rows.
//!
//! Each column's type is mapped once to a [`ColumnDecoder`], which then turns
//! the raw value into a [`CellValue`]. Built-in scalars keep their native
//! representation. Enums, domains over supported types and text-encoded
//! extension types come through as text. Everything else is rendered in
//! PostgreSQL's own text form where the binary layout is known.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::types::{PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgRow, PgTypeKind};
use sqlx::types::BigDecimal;
use sqlx::{Row, TypeInfo};
use std::fmt::{Display, Write};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::batch::CellValue;

const MONEY_FRACTION_DIGITS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnDecoder {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Money,
    Text,
    /// Types whose wire form is plain UTF-8 text (enums, xml, citext)
    RawText,
    Char,
    Date,
    Timestamp,
    TimestampTz,
    Time,
    TimeTz,
    Interval,
    Uuid,
    Json,
    Bytea,
    Inet,
    BoolArray,
    Int2Array,
    Int4Array,
    Int8Array,
    Float8Array,
    TextArray,
    UuidArray,
}

/// Pick the decoder for a column, or `None` when the type cannot be rendered.
pub(crate) fn decoder_for(type_name: &str, kind: &PgTypeKind) -> Option<ColumnDecoder> {
    use ColumnDecoder::*;

    let decoder = match type_name {
        "BOOL" => Bool,
        "INT2" => Int2,
        "INT4" => Int4,
        "INT8" => Int8,
        "FLOAT4" => Float4,
        "FLOAT8" => Float8,
        "NUMERIC" => Numeric,
        "MONEY" => Money,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Text,
        "XML" | "CITEXT" => RawText,
        "\"CHAR\"" | "CHAR" => Char,
        "DATE" => Date,
        "TIMESTAMP" => Timestamp,
        "TIMESTAMPTZ" => TimestampTz,
        "TIME" => Time,
        "TIMETZ" => TimeTz,
        "INTERVAL" => Interval,
        "UUID" => Uuid,
        "JSON" | "JSONB" => Json,
        "BYTEA" => Bytea,
        "INET" | "CIDR" => Inet,
        "BOOL[]" => BoolArray,
        "INT2[]" => Int2Array,
        "INT4[]" => Int4Array,
        "INT8[]" => Int8Array,
        "FLOAT8[]" => Float8Array,
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => TextArray,
        "UUID[]" => UuidArray,
        _ => match kind {
            PgTypeKind::Enum(_) => RawText,
            PgTypeKind::Domain(base) => return decoder_for(base.name(), base.kind()),
            _ => return None,
        },
    };
    Some(decoder)
}

/// Decode one cell of `row` with `decoder`.
pub(crate) fn decode_cell(
    row: &PgRow,
    index: usize,
    decoder: ColumnDecoder,
) -> Result<CellValue, sqlx::Error> {
    use ColumnDecoder as D;

    let value = match decoder {
        D::Bool => row.try_get::<Option<bool>, _>(index)?.map(CellValue::Bool),
        D::Int2 => row
            .try_get::<Option<i16>, _>(index)?
            .map(|v| CellValue::Int(v.into())),
        D::Int4 => row
            .try_get::<Option<i32>, _>(index)?
            .map(|v| CellValue::Int(v.into())),
        D::Int8 => row.try_get::<Option<i64>, _>(index)?.map(CellValue::Int),
        D::Float4 => row
            .try_get::<Option<f32>, _>(index)?
            .map(|v| CellValue::Float(v.into())),
        D::Float8 => row.try_get::<Option<f64>, _>(index)?.map(CellValue::Float),
        D::Numeric => row
            .try_get::<Option<BigDecimal>, _>(index)?
            .map(|v| CellValue::Decimal(v.to_string())),
        D::Money => row
            .try_get::<Option<PgMoney>, _>(index)?
            .map(|v| CellValue::Decimal(v.to_bigdecimal(MONEY_FRACTION_DIGITS).to_string())),
        D::Text => row.try_get::<Option<String>, _>(index)?.map(CellValue::Text),
        D::RawText => row
            .try_get_unchecked::<Option<String>, _>(index)?
            .map(CellValue::Text),
        D::Char => row
            .try_get::<Option<i8>, _>(index)?
            .map(|v| CellValue::Text(char::from(v as u8).to_string())),
        D::Date => row.try_get::<Option<NaiveDate>, _>(index)?.map(CellValue::Date),
        D::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(CellValue::DateTime),
        D::TimestampTz => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|v| CellValue::DateTime(v.naive_utc())),
        D::Time => row.try_get::<Option<NaiveTime>, _>(index)?.map(CellValue::Time),
        D::TimeTz => row.try_get::<Option<PgTimeTz>, _>(index)?.map(|v| {
            CellValue::Text(format!("{}{}", v.time.format("%H:%M:%S%.f"), v.offset))
        }),
        D::Interval => row
            .try_get::<Option<PgInterval>, _>(index)?
            .map(|v| CellValue::Text(format_interval(&v))),
        D::Uuid => row
            .try_get::<Option<uuid::Uuid>, _>(index)?
            .map(|v| CellValue::Text(v.to_string())),
        D::Json => row
            .try_get::<Option<serde_json::Value>, _>(index)?
            .map(|v| CellValue::Text(v.to_string())),
        D::Bytea => row
            .try_get::<Option<Vec<u8>>, _>(index)?
            .map(|v| CellValue::Text(format_bytea(&v))),
        D::Inet => match row.try_get_unchecked::<Option<Vec<u8>>, _>(index)? {
            Some(bytes) => Some(CellValue::Text(
                format_inet(&bytes).map_err(|e| sqlx::Error::Decode(e.into()))?,
            )),
            None => None,
        },
        D::BoolArray => row
            .try_get::<Option<Vec<Option<bool>>>, _>(index)?
            .map(|v| CellValue::Text(format_array(&v, false))),
        D::Int2Array => row
            .try_get::<Option<Vec<Option<i16>>>, _>(index)?
            .map(|v| CellValue::Text(format_array(&v, false))),
        D::Int4Array => row
            .try_get::<Option<Vec<Option<i32>>>, _>(index)?
            .map(|v| CellValue::Text(format_array(&v, false))),
        D::Int8Array => row
            .try_get::<Option<Vec<Option<i64>>>, _>(index)?
            .map(|v| CellValue::Text(format_array(&v, false))),
        D::Float8Array => row
            .try_get::<Option<Vec<Option<f64>>>, _>(index)?
            .map(|v| CellValue::Text(format_array(&v, false))),
        D::TextArray => row
            .try_get_unchecked::<Option<Vec<Option<String>>>, _>(index)?
            .map(|v| CellValue::Text(format_array(&v, true))),
        D::UuidArray => row
            .try_get::<Option<Vec<Option<uuid::Uuid>>>, _>(index)?
            .map(|v| CellValue::Text(format_array(&v, false))),
    };
    Ok(value.unwrap_or(CellValue::Null))
}

/// `\x`-prefixed lowercase hex, as PostgreSQL prints bytea
pub(crate) fn format_bytea(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Interval in PostgreSQL's default output style, e.g. `1 year 2 mons 3 days 04:05:06.5`
pub(crate) fn format_interval(interval: &PgInterval) -> String {
    let mut parts = Vec::new();
    let years = interval.months / 12;
    let months = interval.months % 12;

    let mut unit = |value: i64, singular: &str, plural: &str| {
        if value != 0 {
            let label = if value.abs() == 1 { singular } else { plural };
            parts.push(format!("{value} {label}"));
        }
    };
    unit(years.into(), "year", "years");
    unit(months.into(), "mon", "mons");
    unit(interval.days.into(), "day", "days");

    let micros = interval.microseconds;
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let seconds = total / 1_000_000;
        let fraction = total % 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60
        );
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

/// Render the binary inet/cidr layout: family, prefix bits, is_cidr, length, address.
pub(crate) fn format_inet(bytes: &[u8]) -> Result<String, String> {
    let [family, bits, is_cidr, len, address @ ..] = bytes else {
        return Err(format!("inet value too short ({} bytes)", bytes.len()));
    };
    if address.len() != usize::from(*len) {
        return Err(format!("inet address length {} does not match header {len}", address.len()));
    }

    let (ip, max_bits) = match (*family, address) {
        (2, &[a, b, c, d]) => (Ipv4Addr::new(a, b, c, d).to_string(), 32),
        (3, octets) if octets.len() == 16 => {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(octets);
            (Ipv6Addr::from(raw).to_string(), 128)
        }
        (other, _) => return Err(format!("unknown inet address family {other}")),
    };

    if *is_cidr != 0 || *bits != max_bits {
        Ok(format!("{ip}/{bits}"))
    } else {
        Ok(ip)
    }
}

/// One-dimensional array literal, e.g. `{1,NULL,3}`
pub(crate) fn format_array<T: Display>(values: &[Option<T>], quote: bool) -> String {
    let elements: Vec<String> = values
        .iter()
        .map(|value| match value {
            None => "NULL".to_string(),
            Some(v) if quote => quote_array_element(&v.to_string()),
            Some(v) => v.to_string(),
        })
        .collect();
    format!("{{{}}}", elements.join(","))
}

fn quote_array_element(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.eq_ignore_ascii_case("null")
        || value
            .chars()
            .any(|c| matches!(c, ',' | '{' | '}' | '"' | '\\') || c.is_whitespace());
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
