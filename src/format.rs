//! @acp:module "Format"
//! @acp:summary "Byte sizes, timestamps and table rows for terminal output"
//! @acp:domain cli
//! @acp:layer utility

use chrono::{DateTime, Utc};

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// Human-readable byte size: "512 Byte", "1.50 KB", ... up to TB
pub fn size(bytes: u64) -> String {
    let scaled = |unit: u64| bytes as f64 / unit as f64;
    if bytes < KB {
        format!("{} Byte", bytes)
    } else if bytes < MB {
        format!("{:.2} KB", scaled(KB))
    } else if bytes < GB {
        format!("{:.2} MB", scaled(MB))
    } else if bytes < TB {
        format!("{:.2} GB", scaled(GB))
    } else {
        format!("{:.2} TB", scaled(TB))
    }
}

pub fn timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Horizontal table rule
pub fn rule() -> String {
    "-".repeat(48)
}

/// `| a | b | c |`
pub fn row<S: AsRef<str>>(cells: &[S]) -> String {
    let mut line = String::from("|");
    for cell in cells {
        line.push(' ');
        line.push_str(cell.as_ref());
        line.push_str(" |");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_size_units() {
        assert_eq!(size(0), "0 Byte");
        assert_eq!(size(1023), "1023 Byte");
        assert_eq!(size(1536), "1.50 KB");
        assert_eq!(size(5 * MB), "5.00 MB");
        assert_eq!(size(GB + GB / 4), "1.25 GB");
        assert_eq!(size(3 * TB), "3.00 TB");
    }

    #[test]
    fn test_timestamp() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(timestamp(&time), "2024-03-09 07:05:00");
    }

    #[test]
    fn test_row() {
        assert_eq!(row(&["ap-guangzhou", "web-1"]), "| ap-guangzhou | web-1 |");
    }
}
