//! Console output utilities for CLI commands
//!
//! Boxed headers, status lines, aligned tables and human-readable sizes and
//! durations, plus the writer that tees log output into a file.

use std::io::Write;
use std::time::Duration;

const HEADER_WIDTH: usize = 66;

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a title inside a double-line box
pub fn print_header(title: &str) {
    let bar = "═".repeat(HEADER_WIDTH);
    println!();
    println!("╔{}╗", bar);
    println!("║{:^width$}║", title, width = HEADER_WIDTH);
    println!("╚{}╝", bar);
    println!();
}

/// Print a blank-padded horizontal rule
pub fn print_divider() {
    println!();
    println!("{}", "─".repeat(60));
    println!();
}

fn print_status(marker: char, msg: &str) {
    println!("  {} {}", marker, msg);
}

pub fn print_success(msg: &str) {
    print_status('✓', msg);
}

pub fn print_info(msg: &str) {
    print_status('•', msg);
}

pub fn print_warning(msg: &str) {
    print_status('⚠', msg);
}

pub fn print_error(msg: &str) {
    print_status('✗', msg);
}

/// Print `[step/total] msg`
pub fn print_step(step: usize, total: usize, msg: &str) {
    println!("  [{}/{}] {}", step, total, msg);
}

/// Print label/count rows with the counts right-aligned in one column
pub fn print_counts<'a, I>(rows: I)
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    let rows: Vec<(&str, usize)> = rows.into_iter().collect();
    let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let count_width = rows
        .iter()
        .map(|(_, count)| count.to_string().len())
        .max()
        .unwrap_or(0);

    for (label, count) in rows {
        println!(
            "      {:<lw$}  {:>cw$}",
            label,
            count,
            lw = label_width,
            cw = count_width
        );
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Format a byte count with binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(&str, u64, usize); 3] = [
        ("GB", 1 << 30, 2),
        ("MB", 1 << 20, 2),
        ("KB", 1 << 10, 1),
    ];

    UNITS
        .iter()
        .find(|(_, size, _)| bytes >= *size)
        .map(|(unit, size, precision)| {
            format!(
                "{:.prec$} {}",
                bytes as f64 / *size as f64,
                unit,
                prec = *precision
            )
        })
        .unwrap_or_else(|| format!("{} bytes", bytes))
}

/// Format an elapsed time as `1h 2m`, `3m 4s` or `5.6s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        3600.. => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
        60.. => format!("{}m {}s", secs / 60, secs % 60),
        _ => format!("{:.1}s", duration.as_secs_f64()),
    }
}

// ============================================================================
// Log tee
// ============================================================================

/// Writes log output to stderr and a log file at once
pub struct DualWriter<W: Write> {
    pub console: std::io::Stderr,
    pub file: W,
}

impl<W: Write> DualWriter<W> {
    pub fn new(file: W) -> Self {
        Self {
            console: std::io::stderr(),
            file,
        }
    }
}

impl<W: Write> Write for DualWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // The console copy is best effort; only the file reports errors
        let _ = self.console.write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 bytes");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(3 * 1073741824), "3.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_dual_writer_keeps_file_copy() {
        let mut writer = DualWriter::new(Vec::new());
        writer.write_all(b"[INFO] exported 3 files\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.file, b"[INFO] exported 3 files\n");
    }
}
