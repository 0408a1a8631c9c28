use color_eyre::Result;
use color_eyre::eyre::anyhow;
use time::{Duration, OffsetDateTime};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const HUMAN_READABLE_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [hour repr:24]:[minute]");

// Jenkins reports timestamps and durations in milliseconds
pub fn format_epoch_millis(millis: i64) -> Result<String> {
    let datetime = OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)?;

    datetime
        .format(&HUMAN_READABLE_DATE_FORMAT)
        .map_err(|e| anyhow!(e))
}

/// `HH:MM:SS`, hours keep counting past a day.
pub fn format_duration(millis: i64) -> Result<String> {
    let duration = Duration::milliseconds(millis);
    if duration.is_negative() {
        return Err(anyhow!("negative duration: {millis}ms"));
    }

    let seconds = duration.whole_seconds();
    Ok(format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    ))
}
