use std::{borrow::Cow, time::Duration};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProgressMode {
    Hidden,
    Visible,
}

/// Reports progress over a known amount of work. A logger is a cheap
/// description of the display; the terminal state only exists while a
/// session is running.
pub trait ProgressLogger {
    type Session: ProgressSession;
    fn start_session(self, total: usize) -> Self::Session;
}

pub trait ProgressSession {
    fn update(&mut self, progress: usize);
    fn finish(self);
}

#[derive(Clone, Debug)]
pub struct ProgressBarLogger {
    name: String,
    mode: ProgressMode,
}

pub fn bar(mode: ProgressMode, name: impl ToString) -> ProgressBarLogger {
    ProgressBarLogger {
        name: name.to_string(),
        mode,
    }
}

#[derive(Clone, Debug)]
pub struct ProgressBarSession {
    bar: indicatif::ProgressBar,
}

impl ProgressLogger for ProgressBarLogger {
    type Session = ProgressBarSession;

    fn start_session(self, total: usize) -> Self::Session {
        let bar = indicatif::ProgressBar::with_draw_target(
            Some(total as u64),
            match self.mode {
                ProgressMode::Hidden => indicatif::ProgressDrawTarget::hidden(),
                ProgressMode::Visible => indicatif::ProgressDrawTarget::stderr(),
            },
        );
        bar.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:.green}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("## "),
        );
        bar.set_message(Cow::Owned(self.name));
        bar.enable_steady_tick(Duration::from_millis(120));
        ProgressBarSession { bar }
    }
}

impl ProgressSession for ProgressBarSession {
    fn update(&mut self, inc: usize) {
        self.bar.inc(inc as u64);
    }

    fn finish(self) {
        self.bar.finish();
    }
}
