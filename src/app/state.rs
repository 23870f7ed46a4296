use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use tracesync_logs::{
    FilterInstallError, FilteredView, RecordGenerator, SystemClock, TimeSync, TraceProducer,
    TraceStore, ViewEvent,
};

use super::Command;
use super::command::HELP;
use super::output::Printer;
use crate::config::AppConfig;

/// What the event loop should do after a command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Console application state: one store, one producer, several views
pub struct App<W: Write> {
    store: TraceStore,
    producer: TraceProducer,

    /// Taken by [`App::start`]
    generator: Option<RecordGenerator>,

    views: Vec<FilteredView>,

    /// Index of the view commands act on
    active: usize,

    /// Print new rows of the active view as they arrive?
    follow: bool,

    printer: Printer<W>,
}

impl<W: Write> App<W> {
    /// Build the store, seed it with the backlog and set up the views
    pub fn new(config: &AppConfig, out: W) -> Result<Self> {
        let clock = Arc::new(SystemClock::new());
        let mut generator = match config.seed {
            Some(seed) => RecordGenerator::seeded(clock, seed),
            None => RecordGenerator::new(clock),
        };

        let store = TraceStore::new();
        for record in generator.backlog(config.backlog) {
            store.enqueue(record);
        }
        store.drain_tick();
        info!(
            backlog = config.backlog,
            modules = ?generator.modules(),
            "trace store seeded"
        );

        let sync = TimeSync::new();
        let mut views = Vec::with_capacity(config.views);
        for i in 0..config.views {
            let mut view = FilteredView::new(store.clone());
            view.attach_sync(sync.join());
            view.set_format(&config.format)
                .with_context(|| format!("Invalid display format for view {}", i))?;
            views.push(view);
        }
        if let Some(filter) = &config.filter {
            match views[0].set_filter_text(filter) {
                // Nothing to check identifiers against yet; the filter can be set later
                Err(FilterInstallError::NoSampleRecord) => {
                    warn!(filter = %filter, "empty backlog, initial filter not installed");
                }
                result => {
                    result.with_context(|| format!("Invalid initial filter '{}'", filter))?
                }
            }
        }
        for view in &mut views {
            view.take_events();
        }

        Ok(Self {
            store,
            producer: TraceProducer::new(config.producer()),
            generator: Some(generator),
            views,
            active: 0,
            follow: true,
            printer: Printer::new(out, config.output),
        })
    }

    /// Start streaming; must run inside the tokio runtime
    pub fn start(&mut self) {
        if let Some(generator) = self.generator.take() {
            self.producer.start(self.store.sender(), generator);
        }
    }

    /// Drain the hand-off queue and report what changed
    pub fn tick(&mut self) -> Result<()> {
        self.store.drain_tick();
        for view in &mut self.views {
            view.refresh();
        }
        self.report()
    }

    pub fn handle(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::View(index) => {
                if index < self.views.len() {
                    self.active = index;
                    self.printer.notice(&format!("view {} active", index))?;
                } else {
                    self.printer
                        .error(&format!("no view {} (have {})", index, self.views.len()))?;
                }
            }

            Command::Filter(text) => {
                let text = text.unwrap_or_default();
                match self.views[self.active].set_filter_text(&text) {
                    Ok(()) => {
                        let rows = self.views[self.active].row_count();
                        let message = if text.is_empty() {
                            format!("view {}: filter cleared, {} rows", self.active, rows)
                        } else {
                            format!("view {}: {} rows match", self.active, rows)
                        };
                        self.printer.notice(&message)?;
                    }
                    Err(FilterInstallError::Syntax(e)) => {
                        self.printer.error(&format!("{}\n{}", e, e.context()))?;
                    }
                    Err(e) => self.printer.error(&e.to_string())?,
                }
            }

            Command::Format(template) => match self.views[self.active].set_format(&template) {
                Ok(()) => self
                    .printer
                    .notice(&format!("view {}: format set", self.active))?,
                Err(e) => self.printer.error(&e.to_string())?,
            },

            Command::Select(row) => match self.views[self.active].select_row(row) {
                Ok(timestamp) => {
                    self.printer.notice(&format!(
                        "view {}: selected row {} at {}",
                        self.active, row, timestamp
                    ))?;
                    self.report()?;
                }
                Err(e) => self.printer.error(&e.to_string())?,
            },

            Command::Goto(timestamp) => match self.store.nearest_index(timestamp) {
                Ok(index) => {
                    let record = self.store.record_at(index)?;
                    self.printer.notice(&format!(
                        "index {} at {}: {}",
                        index,
                        record.timestamp(),
                        record
                    ))?;
                }
                Err(e) => self.printer.error(&e.to_string())?,
            },

            Command::Show { start, count } => {
                let view = &mut self.views[self.active];
                let end = view.row_count().min(start.saturating_add(count));
                if start >= end {
                    self.printer.notice(&format!("view {}: no rows there", self.active))?;
                }
                for row in start..end {
                    let record = view.record(row)?;
                    let rendered = view.data(row)?;
                    self.printer.row(self.active, row, &record, &rendered)?;
                }
            }

            Command::Count => {
                self.printer
                    .notice(&format!("store: {} records", self.store.row_count()))?;
                for (i, view) in self.views.iter_mut().enumerate() {
                    let filter = view
                        .filter()
                        .map(|f| f.source().to_string())
                        .unwrap_or_else(|| "none".to_string());
                    let rows = view.row_count();
                    self.printer
                        .notice(&format!("view {}: {} rows, filter: {}", i, rows, filter))?;
                }
            }

            Command::Follow(follow) => {
                self.follow = follow;
                self.printer
                    .notice(&format!("follow {}", if follow { "on" } else { "off" }))?;
            }

            Command::Pause => {
                self.producer.pause();
                self.printer.notice("producer paused")?;
            }

            Command::Resume => {
                self.producer.resume();
                self.printer.notice("producer resumed")?;
            }

            Command::Clear => {
                self.store.clear();
                for view in &mut self.views {
                    view.refresh();
                }
                self.report()?;
            }

            Command::Help => {
                for line in HELP.lines() {
                    self.printer.notice(line)?;
                }
            }

            Command::Quit => return Ok(Flow::Quit),
        }

        self.printer.flush()?;
        Ok(Flow::Continue)
    }

    /// Report an error reading or parsing a command
    pub fn reject(&mut self, err: &anyhow::Error) -> Result<()> {
        self.printer.error(&format!("{:#}", err))?;
        self.printer.flush()
    }

    pub fn shutdown(&mut self) {
        self.producer.stop();
    }

    /// Apply pending time sync and print each view's queued events
    fn report(&mut self) -> Result<()> {
        for (i, view) in self.views.iter_mut().enumerate() {
            view.apply_sync();
            let active = i == self.active;

            for event in view.take_events() {
                match event {
                    ViewEvent::Inserted { start, end } if active && self.follow => {
                        for row in start..end {
                            let record = view.record(row)?;
                            let rendered = view.data(row)?;
                            self.printer.row(i, row, &record, &rendered)?;
                        }
                    }
                    ViewEvent::Removed { start, end } if active => {
                        self.printer
                            .notice(&format!("view {}: rows {}..{} removed", i, start, end))?;
                    }
                    ViewEvent::Reset if active => {
                        let rows = view.row_count();
                        self.printer.notice(&format!("view {}: {} rows", i, rows))?;
                    }
                    ViewEvent::ScrollTo { row } => {
                        let record = view.record(row)?;
                        self.printer.synced(i, row, &record)?;
                    }
                    _ => {}
                }
            }
        }
        self.printer.flush()
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.printer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracesync_types::Record;

    fn config() -> AppConfig {
        AppConfig {
            backlog: 50,
            seed: Some(1),
            ..AppConfig::default()
        }
    }

    fn run(app: App<Vec<u8>>) -> String {
        String::from_utf8(app.into_output()).unwrap()
    }

    #[test]
    fn test_backlog_fills_views() {
        let mut app = App::new(&config(), Vec::new()).unwrap();
        app.handle(Command::Count).unwrap();
        let out = run(app);
        assert!(out.contains("# store: 50 records"));
        assert!(out.contains("# view 0: 50 rows, filter: none"));
        assert!(out.contains("# view 1: 50 rows, filter: none"));
    }

    #[test]
    fn test_filter_commands() {
        let mut app = App::new(&config(), Vec::new()).unwrap();
        app.handle(Command::Filter(Some("timestamp eq".to_string())))
            .unwrap();
        app.handle(Command::Filter(Some("bogus eq 1".to_string())))
            .unwrap();
        app.handle(Command::Filter(Some(r#"task_id in ["2", "3", "4", "5"]"#.to_string())))
            .unwrap();
        app.handle(Command::Filter(None)).unwrap();

        let out = run(app);
        assert!(out.contains("error: unexpected end of input"));
        assert!(out.contains("Unknown identifier bogus"));
        assert!(out.contains("# view 0: 50 rows match"));
        assert!(out.contains("# view 0: filter cleared, 50 rows"));
    }

    #[test]
    fn test_initial_filter_and_bad_config() {
        let app = App::new(
            &AppConfig {
                filter: Some("message contains".to_string()),
                ..config()
            },
            Vec::new(),
        );
        assert!(app.is_err());

        let app = App::new(
            &AppConfig {
                format: "{nope}".to_string(),
                ..config()
            },
            Vec::new(),
        );
        assert!(app.is_err());
    }

    #[test]
    fn test_initial_filter_with_empty_backlog() {
        let mut app = App::new(
            &AppConfig {
                backlog: 0,
                filter: Some(r#"module eq "net""#.to_string()),
                ..config()
            },
            Vec::new(),
        )
        .unwrap();
        assert!(app.views[0].filter().is_none());

        app.handle(Command::Count).unwrap();
        let out = run(app);
        assert!(out.contains("# view 0: 0 rows, filter: none"));
    }

    #[test]
    fn test_select_syncs_other_view() {
        let mut app = App::new(&config(), Vec::new()).unwrap();
        app.handle(Command::Select(10)).unwrap();
        let out = run(app);
        assert!(out.contains("# view 0: selected row 10"));
        // Equal timestamps may put the synced row just after the selected one
        assert!(out.contains("# view 1 synced to row "));
        assert!(!out.contains("# view 0 synced"));
    }

    #[test]
    fn test_tick_prints_followed_rows() {
        let mut app = App::new(&config(), Vec::new()).unwrap();
        app.store.enqueue(Record::new("2", "sensor", i64::MAX, "late arrival"));
        app.tick().unwrap();

        app.handle(Command::Follow(false)).unwrap();
        app.store.enqueue(Record::new("2", "sensor", i64::MAX, "unseen"));
        app.tick().unwrap();

        let out = run(app);
        assert!(out.contains("0:    50 [9223372036854775807][sensor    ] : late arrival"));
        assert!(!out.contains("unseen"));
    }

    #[test]
    fn test_clear_and_goto() {
        let mut app = App::new(&config(), Vec::new()).unwrap();
        app.handle(Command::Goto(i64::MAX)).unwrap();
        app.handle(Command::Clear).unwrap();
        app.handle(Command::Goto(0)).unwrap();
        app.handle(Command::Show { start: 0, count: 5 }).unwrap();

        let out = run(app);
        assert!(out.contains("# index 49 at "));
        assert!(out.contains("# view 0: rows 0..50 removed"));
        assert!(out.contains("error: No records to search"));
        assert!(out.contains("# view 0: no rows there"));
    }

    #[test]
    fn test_view_switch_and_quit() {
        let mut app = App::new(&config(), Vec::new()).unwrap();
        assert_eq!(app.handle(Command::View(1)).unwrap(), Flow::Continue);
        assert_eq!(app.handle(Command::View(5)).unwrap(), Flow::Continue);
        assert_eq!(app.handle(Command::Quit).unwrap(), Flow::Quit);
        let out = run(app);
        assert!(out.contains("# view 1 active"));
        assert!(out.contains("error: no view 5 (have 2)"));
    }
}
