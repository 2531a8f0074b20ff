//! Human-readable file sizes.

const KIB: f64 = 1024.0;

/// Formats a byte count as `"<value><unit>"` with one decimal place.
///
/// Starts at the kilobyte scale and switches to megabytes once the
/// kilobyte value, as it would be displayed, reaches `1024.0`. There is no
/// scale above megabytes. The megabyte value is computed from the raw byte
/// count so it is only rounded once.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / KIB;
    let kb_display = round_one_decimal(kb);
    if kb_display >= KIB {
        format!("{:.1}MB", kb / KIB)
    } else {
        format!("{kb_display:.1}KB")
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
