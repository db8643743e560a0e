//! Check-in date normalization.
//!
//! Front-desk staff type dates in whichever order their locale prefers. Four
//! layouts are accepted, all with zero-padded day and month and a four-digit
//! year:
//!
//! | Layout       | Example      |
//! |--------------|--------------|
//! | `YYYY-MM-DD` | `2024-01-05` |
//! | `DD.MM.YYYY` | `05.01.2024` |
//! | `DD-MM-YYYY` | `05-01-2024` |
//! | `YYYY.MM.DD` | `2024.01.05` |

use chrono::NaiveDate;

/// Accepted layouts as (shape, chrono format) pairs. In a shape `N` stands
/// for one ASCII digit and every other byte must match literally.
const LAYOUTS: &[(&str, &str)] = &[
    ("NNNN-NN-NN", "%Y-%m-%d"),
    ("NN.NN.NNNN", "%d.%m.%Y"),
    ("NN-NN-NNNN", "%d-%m-%Y"),
    ("NNNN.NN.NN", "%Y.%m.%d"),
];

/// Normalize a check-in date to a calendar date.
///
/// Returns `None` when the input matches none of the accepted layouts or names
/// a day that does not exist (`13-13-2024`, `2023-02-29`).
///
/// ```
/// use loyalty_core::normalize_checkin_date;
///
/// let date = normalize_checkin_date("05.01.2024").unwrap();
/// assert_eq!(date.to_string(), "2024-01-05");
/// assert!(normalize_checkin_date("13-13-2024").is_none());
/// ```
#[must_use]
pub fn normalize_checkin_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    LAYOUTS
        .iter()
        .find(|(shape, _)| matches_shape(raw, shape))
        .and_then(|(_, format)| NaiveDate::parse_from_str(raw, format).ok())
}

fn matches_shape(input: &str, shape: &str) -> bool {
    input.len() == shape.len()
        && input
            .bytes()
            .zip(shape.bytes())
            .all(|(c, s)| if s == b'N' { c.is_ascii_digit() } else { c == s })
}
