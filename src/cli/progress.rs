use crate::infrastructure::remote::DownloadProgress;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta}) {percent}%";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})";

/// 下载进度条，总大小未知时退化为只显示已下载字节数的 spinner
pub struct DownloadBar {
    bar: ProgressBar,
    sized: bool,
}

impl DownloadBar {
    pub fn new(hidden: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        if hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            bar.set_style(style);
        }
        Self { bar, sized: false }
    }

    /// 更新进度，首次得知总大小时切换为进度条样式
    pub fn update(&mut self, progress: DownloadProgress) {
        if let (false, Some(total)) = (self.sized, progress.total.filter(|t| *t > 0)) {
            self.bar.set_length(total);
            if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                self.bar.set_style(style.progress_chars("#>-"));
            }
            self.sized = true;
        }
        self.bar.set_position(progress.written);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
