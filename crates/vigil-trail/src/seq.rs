use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use vigil_core::TrailError;

/// `YYYYMMDD` key for the per-(kind, date) counter.
pub fn date_key(now_unix: i64) -> Result<String, TrailError> {
    let dt = OffsetDateTime::from_unix_timestamp(now_unix).map_err(TrailError::storage)?;
    dt.format(&format_description!("[year][month][day]"))
        .map_err(TrailError::storage)
}

/// RFC3339 wall-clock duplicate stored next to the epoch timestamp.
pub fn rfc3339(now_unix: i64) -> Result<String, TrailError> {
    let dt = OffsetDateTime::from_unix_timestamp(now_unix).map_err(TrailError::storage)?;
    dt.format(&Rfc3339).map_err(TrailError::storage)
}

/// Short human-readable tail for entry ids: lowercased, non-alphanumerics
/// collapsed to single dashes, truncated.
pub fn slug(text: &str) -> String {
    let mut out = String::new();
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
        if out.len() >= 24 {
            break;
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        "entry".to_string()
    } else {
        out
    }
}

/// Assemble `{TYPE}-{DATE}-{SEQ}-{slug}`.
pub fn entry_id(kind: &str, date: &str, seq: u64, action: &str) -> String {
    let ty: String = kind
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let ty = if ty.is_empty() { "ENTRY".to_string() } else { ty };
    format!("{}-{}-{:04}-{}", ty, date, seq, slug(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_key_formats_yyyymmdd() {
        // 2026-08-27T00:00:00Z
        assert_eq!(date_key(1_787_788_800).unwrap(), "20260827");
    }

    #[test]
    fn slug_collapses_and_truncates() {
        assert_eq!(slug("Origin gate: PASS!"), "origin-gate-pass");
        assert_eq!(slug("___"), "entry");
        assert!(slug("a very long action description that keeps going").len() <= 24);
    }

    #[test]
    fn entry_id_shape() {
        let id = entry_id("gate", "20260827", 3, "origin pass");
        assert_eq!(id, "GATE-20260827-0003-origin-pass");
    }
}
