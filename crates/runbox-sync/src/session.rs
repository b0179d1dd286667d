use std::sync::{Arc, Mutex};
use std::time::Duration;

use runbox_types::{CodeFile, FileSet};
use tracing::debug;

use crate::debounce::Debouncer;
use crate::editor::Editor;
use crate::engine::{StoreOutcome, SyncEngine};
use crate::error::{SyncError, SyncResult};
use crate::runner::{CodeRunner, RunEvent, RunOutput};
use crate::transport::StoreTransport;

/// The save indicator next to the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveStatus {
    pub message: String,
    /// Success messages fade after a while; failures stay until replaced.
    pub faded: bool,
}

#[derive(Debug)]
struct StatusLine {
    status: SaveStatus,
    generation: u64,
}

struct Shared<T> {
    engine: SyncEngine<T>,
    editor: Arc<dyn Editor>,
    runner: Arc<dyn CodeRunner>,
    files: Mutex<FileSet>,
    output: Mutex<RunOutput>,
    status: Arc<Mutex<StatusLine>>,
    status_fade: Duration,
}

impl<T: StoreTransport + 'static> Shared<T> {
    fn start_run(&self, files: &FileSet, warmup: bool) {
        self.output.lock().expect("lock poisoned").begin();
        self.runner.run(files, warmup);
    }

    /// Copy the editor text into the active file and snapshot the set.
    fn sync_editor(&self) -> FileSet {
        let mut files = self.files.lock().expect("lock poisoned");
        files.set_active_content(self.editor.get_value());
        files.clone()
    }

    fn show(&self, message: impl Into<String>, fades: bool) {
        let generation = {
            let mut line = self.status.lock().expect("lock poisoned");
            line.generation += 1;
            line.status = SaveStatus {
                message: message.into(),
                faded: false,
            };
            line.generation
        };
        if !fades {
            return;
        }
        let status = self.status.clone();
        let fade = self.status_fade;
        tokio::spawn(async move {
            tokio::time::sleep(fade).await;
            let mut line = status.lock().expect("lock poisoned");
            // a newer message owns the line now
            if line.generation == generation {
                line.status.faded = true;
            }
        });
    }

    async fn save(&self, files: FileSet, verbose: bool) -> SyncResult<Option<StoreOutcome>> {
        if !self.engine.save_enabled() {
            return Ok(None);
        }
        match self.engine.store(&files, false).await {
            Ok(Some(outcome)) => {
                self.show(outcome.message(), true);
                Ok(Some(outcome))
            }
            Ok(None) => {
                if verbose {
                    self.show("Up to date", true);
                }
                Ok(None)
            }
            Err(e) => {
                self.show(format!("Failed to save, {e}"), false);
                Err(e)
            }
        }
    }

    /// Save whose failure is reported on the status line only.
    async fn save_quietly(&self, files: FileSet) {
        if let Err(e) = self.save(files, false).await {
            debug!(error = %e, "background save failed");
        }
    }
}

/// Editor session: the file tabs, the editor, the runner and the engine wired
/// together.
///
/// Edits go through [`on_edit`](Self::on_edit) and are saved after the
/// autosave delay. Tab operations and runs save immediately; their save
/// failures appear on the status line rather than as errors. Explicit saves,
/// toggling save on, and forks return their errors too.
pub struct Session<T> {
    shared: Arc<Shared<T>>,
    autosave: Debouncer,
}

impl<T: StoreTransport + 'static> Session<T> {
    /// Load the page, fill the editor with the active file and warm up the
    /// runner.
    pub async fn start(
        engine: SyncEngine<T>,
        editor: Arc<dyn Editor>,
        runner: Arc<dyn CodeRunner>,
    ) -> SyncResult<Self> {
        let initial = engine.retrieve().await?;
        let content = initial
            .files
            .active()
            .map(|f| f.content.clone())
            .unwrap_or_default();
        editor.set_value(&content);

        let config = *engine.config();
        let shared = Arc::new(Shared {
            engine,
            editor,
            runner,
            files: Mutex::new(initial.files.clone()),
            output: Mutex::new(RunOutput::default()),
            status: Arc::new(Mutex::new(StatusLine {
                status: SaveStatus {
                    message: "Changes not saved".into(),
                    faded: false,
                },
                generation: 0,
            })),
            status_fade: config.status_fade,
        });
        shared.start_run(&initial.files, true);

        let background = shared.clone();
        let autosave = Debouncer::spawn(config.autosave_delay, move || {
            let shared = background.clone();
            async move {
                let files = shared.sync_editor();
                shared.save_quietly(files).await;
            }
        });

        Ok(Self { shared, autosave })
    }

    pub fn engine(&self) -> &SyncEngine<T> {
        &self.shared.engine
    }

    pub fn files(&self) -> FileSet {
        self.shared.files.lock().expect("lock poisoned").clone()
    }

    pub fn status(&self) -> SaveStatus {
        self.shared.status.lock().expect("lock poisoned").status.clone()
    }

    /// Output of the current run.
    pub fn run_output(&self) -> RunOutput {
        self.shared.output.lock().expect("lock poisoned").clone()
    }

    /// Feed an event from the runner. Returns `true` if the terminal text
    /// changed.
    pub fn on_run_event(&self, event: RunEvent) -> bool {
        self.shared.output.lock().expect("lock poisoned").apply(event)
    }

    /// Forking needs a stored record to fork from.
    pub fn allow_fork(&self) -> bool {
        self.shared.engine.current_read_key().is_some()
    }

    /// The editor content changed.
    pub fn on_edit(&self) {
        self.shared.engine.mark_edited();
        self.autosave.trigger();
    }

    /// Explicit save. `verbose` reports "Up to date" when nothing changed.
    pub async fn save(&self, verbose: bool) -> SyncResult<Option<StoreOutcome>> {
        let files = self.shared.sync_editor();
        self.shared.save(files, verbose).await
    }

    pub async fn toggle_save(&self, enabled: bool) -> SyncResult<Option<StoreOutcome>> {
        self.shared.engine.set_save_enabled(enabled);
        if !enabled {
            return Ok(None);
        }
        self.save(true).await
    }

    /// Run the current files, then save them.
    pub async fn run(&self) {
        let files = self.shared.sync_editor();
        self.shared.start_run(&files, false);
        self.shared.save_quietly(files).await;
    }

    /// Switch the editor to `name`.
    pub async fn change_file(&self, name: &str) -> SyncResult<()> {
        let files = {
            let mut files = self.shared.files.lock().expect("lock poisoned");
            files.set_active_content(self.shared.editor.get_value());
            files.focus(name)?;
            if let Some(file) = files.get(name) {
                self.shared.editor.set_value(&file.content);
            }
            files.clone()
        };
        self.shared.save_quietly(files).await;
        Ok(())
    }

    /// Add an empty file and switch to it. Without a name the next free
    /// `new.py`, `new_1.py`, ... is used. Returns the name.
    pub async fn add_file(&self, name: Option<&str>) -> SyncResult<String> {
        let name = {
            let mut files = self.shared.files.lock().expect("lock poisoned");
            let name = name.map_or_else(|| files.next_free_name(), str::to_owned);
            files.push(CodeFile::new(name.clone(), ""))?;
            name
        };
        self.change_file(&name).await?;
        Ok(name)
    }

    /// Close a tab. The last file cannot be closed.
    pub async fn close_file(&self, name: &str) -> SyncResult<()> {
        let files = {
            let mut files = self.shared.files.lock().expect("lock poisoned");
            files.set_active_content(self.shared.editor.get_value());
            let was_active = files.active().is_some_and(|f| f.name == name);
            files.remove(name)?;
            if was_active {
                let content = files.active().map(|f| f.content.clone()).unwrap_or_default();
                self.shared.editor.set_value(&content);
            }
            files.clone()
        };
        self.shared.save_quietly(files).await;
        Ok(())
    }

    /// Save the current files as a brand-new sandbox and move to it. Like
    /// any save this does nothing while saving is off.
    pub async fn fork(&self) -> SyncResult<Option<StoreOutcome>> {
        if !self.allow_fork() {
            return Err(SyncError::ForkUnavailable);
        }
        let files = self.shared.sync_editor();
        match self.shared.engine.store(&files, true).await {
            Ok(Some(outcome)) => {
                self.shared.show(outcome.message(), true);
                Ok(Some(outcome))
            }
            Ok(None) => Ok(None),
            Err(e @ SyncError::ForkCooldown { .. }) => Err(e),
            Err(e) => {
                self.shared.show(format!("Failed to save, {e}"), false);
                Err(e)
            }
        }
    }

    /// Stop autosave, running a pending save first.
    pub async fn close(self) {
        self.autosave.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::BufferEditor;
    use crate::engine::SyncState;
    use crate::location::PageLocation;
    use crate::testing::MemoryTransport;
    use runbox_types::{ReadKey, TypeError};

    #[derive(Default)]
    struct RecordingRunner {
        runs: Mutex<Vec<(FileSet, bool)>>,
    }

    impl CodeRunner for RecordingRunner {
        fn run(&self, files: &FileSet, warmup: bool) {
            self.runs.lock().unwrap().push((files.clone(), warmup));
        }
    }

    struct Fixture {
        session: Session<MemoryTransport>,
        editor: Arc<BufferEditor>,
        runner: Arc<RecordingRunner>,
    }

    impl Fixture {
        fn transport(&self) -> &MemoryTransport {
            self.session.engine().transport()
        }

        fn type_text(&self, text: &str) {
            self.editor.set_value(text);
            self.session.on_edit();
        }
    }

    async fn fixture(path: &str) -> Fixture {
        fixture_with(MemoryTransport::new(), path).await
    }

    async fn fixture_with(transport: MemoryTransport, path: &str) -> Fixture {
        let editor = Arc::new(BufferEditor::default());
        let runner = Arc::new(RecordingRunner::default());
        let engine = SyncEngine::new(transport, PageLocation::new(path));
        let session = Session::start(engine, editor.clone(), runner.clone()).await.unwrap();
        Fixture { session, editor, runner }
    }

    #[tokio::test(start_paused = true)]
    async fn start_fills_editor_and_warms_runner() {
        let f = fixture("/").await;
        assert_eq!(f.editor.get_value(), "print('hello world')\n");
        let runs = f.runner.runs.lock().unwrap();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].1);
        assert_eq!(f.session.status().message, "Changes not saved");
    }

    #[tokio::test(start_paused = true)]
    async fn start_loads_stored_active_file() {
        let transport = MemoryTransport::new();
        let files = FileSet::new(vec![
            CodeFile::new("a.py", "a"),
            CodeFile::new("b.py", "b").with_active_index(2),
        ]);
        transport
            .insert(ReadKey::parse("00000000000000aa").unwrap(), None, &files)
            .unwrap();
        let f = fixture_with(transport, "/store/00000000000000aa").await;
        assert_eq!(f.editor.get_value(), "b");
        assert!(f.session.allow_fork());
    }

    #[tokio::test(start_paused = true)]
    async fn edits_without_save_enabled_stay_local() {
        let f = fixture("/").await;
        f.type_text("x = 1");
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(f.transport().write_count(), 0);
        assert_eq!(f.session.status().message, "Changes not saved");
    }

    #[tokio::test(start_paused = true)]
    async fn enabling_save_creates_then_autosave_updates() {
        let f = fixture("/").await;
        let outcome = f.session.toggle_save(true).await.unwrap().unwrap();
        assert!(outcome.is_new_sandbox());
        assert_eq!(f.session.status().message, "New sandbox created");

        for text in ["p", "pr", "pri", "print(2)"] {
            f.type_text(text);
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(f.transport().update_count(), 0);
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(f.transport().update_count(), 1);
        assert_eq!(f.session.status().message, "Changes saved");

        let key = f.session.engine().current_read_key().unwrap();
        let stored = FileSet::from_json(f.transport().body(&key).unwrap().as_bytes()).unwrap();
        assert_eq!(stored.active().unwrap().content, "print(2)");
        assert_eq!(f.session.engine().sync_state(), SyncState::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn verbose_save_without_changes_is_up_to_date() {
        let f = fixture("/").await;
        f.session.toggle_save(true).await.unwrap();
        assert_eq!(f.session.save(true).await.unwrap(), None);
        assert_eq!(f.session.status().message, "Up to date");
        assert_eq!(f.transport().write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_fades_failure_does_not() {
        let f = fixture("/").await;
        f.session.toggle_save(true).await.unwrap();
        assert!(!f.session.status().faded);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(f.session.status().faded);

        f.transport().set_failing(true);
        f.editor.set_value("changed");
        assert!(f.session.save(false).await.is_err());
        let status = f.session.status();
        assert!(status.message.starts_with("Failed to save, 500"));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!f.session.status().faded);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_message_restarts_fade() {
        let f = fixture("/").await;
        f.session.toggle_save(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        f.session.save(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(f.session.status().message, "Up to date");
        assert!(!f.session.status().faded);
    }

    #[tokio::test(start_paused = true)]
    async fn tabs() {
        let f = fixture("/blank").await;
        f.editor.set_value("main body");

        let name = f.session.add_file(None).await.unwrap();
        assert_eq!(name, "new.py");
        assert_eq!(f.editor.get_value(), "");
        assert_eq!(f.session.files().active().unwrap().name, "new.py");
        assert_eq!(f.session.files().get("main.py").unwrap().content, "main body");

        f.editor.set_value("second");
        f.session.change_file("main.py").await.unwrap();
        assert_eq!(f.editor.get_value(), "main body");
        assert_eq!(f.session.files().get("new.py").unwrap().content, "second");

        assert_eq!(f.session.add_file(None).await.unwrap(), "new_1.py");
        let dup = f.session.add_file(Some("main.py")).await.unwrap_err();
        assert!(matches!(dup, SyncError::Types(TypeError::DuplicateFileName(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_active_tab_loads_next_active() {
        let f = fixture("/blank").await;
        f.session.add_file(Some("a.py")).await.unwrap();
        f.editor.set_value("in a");
        f.session.add_file(Some("b.py")).await.unwrap();
        f.session.change_file("a.py").await.unwrap();

        f.session.close_file("a.py").await.unwrap();
        // b.py held the highest index after a.py
        assert_eq!(f.session.files().active().unwrap().name, "b.py");
        assert_eq!(f.editor.get_value(), "");
        assert!(!f.session.files().contains("a.py"));
    }

    #[tokio::test(start_paused = true)]
    async fn last_file_cannot_close() {
        let f = fixture("/").await;
        let err = f.session.close_file("main.py").await.unwrap_err();
        assert!(matches!(err, SyncError::Types(TypeError::LastFile(_))));
        assert_eq!(f.session.files().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_uses_editor_text_and_saves() {
        let f = fixture("/").await;
        f.session.toggle_save(true).await.unwrap();
        f.editor.set_value("print(42)");
        f.session.run().await;

        let runs = f.runner.runs.lock().unwrap();
        let (files, warmup) = runs.last().unwrap();
        assert!(!warmup);
        assert_eq!(files.active().unwrap().content, "print(42)");
        assert_eq!(f.transport().update_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_events_fill_output_until_next_run() {
        let f = fixture("/").await;
        assert_eq!(f.session.run_output().status, "Launching Python...");

        assert!(!f.session.on_run_event(RunEvent::Status { message: "Ready".into() }));
        assert!(f.session.on_run_event(RunEvent::Print {
            data: vec![b"hello world\n".to_vec()],
        }));
        f.session.on_run_event(RunEvent::End);
        let out = f.session.run_output();
        assert_eq!(out.status, "Ready");
        assert_eq!(out.terminal, "hello world\n");
        assert!(out.finished);

        f.session.run().await;
        let out = f.session.run_output();
        assert_eq!(out.status, "Launching Python...");
        assert_eq!(out.terminal, "");
        assert!(!out.finished);
    }

    #[tokio::test(start_paused = true)]
    async fn fork_needs_a_stored_record() {
        let f = fixture("/").await;
        assert!(!f.session.allow_fork());
        assert!(matches!(f.session.fork().await, Err(SyncError::ForkUnavailable)));

        f.session.toggle_save(true).await.unwrap();
        let first = f.session.engine().current_read_key().unwrap();
        let outcome = f.session.fork().await.unwrap().unwrap();
        assert_eq!(outcome.message(), "New sandbox created");
        assert_ne!(f.session.engine().current_read_key().unwrap(), first);

        let again = f.session.fork().await.unwrap_err();
        assert!(matches!(again, SyncError::ForkCooldown { .. }));
        assert_eq!(f.transport().create_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fork_with_save_off_sends_nothing() {
        let transport = MemoryTransport::new();
        let files = FileSet::new(vec![CodeFile::new("main.py", "theirs").with_active_index(1)]);
        transport
            .insert(ReadKey::parse("00000000000000aa").unwrap(), None, &files)
            .unwrap();
        let f = fixture_with(transport, "/store/00000000000000aa").await;
        assert!(f.session.allow_fork());

        assert_eq!(f.session.fork().await.unwrap(), None);
        assert_eq!(f.transport().create_count(), 0);
        assert_eq!(f.session.status().message, "Changes not saved");
        assert_eq!(
            f.session.engine().location().path(),
            "/store/00000000000000aa"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_save_waits_for_autosave_in_flight() {
        let f = fixture("/").await;
        f.session.toggle_save(true).await.unwrap();
        let gate = f.transport().hold_updates();

        f.type_text("from autosave");
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(f.transport().update_count(), 1);

        f.editor.set_value("from explicit save");
        let save = f.session.save(false);
        tokio::pin!(save);
        tokio::select! {
            _ = &mut save => panic!("save overlapped the autosave"),
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
        assert_eq!(f.transport().update_count(), 1);

        gate.notify_one();
        gate.notify_one();
        save.await.unwrap();
        assert_eq!(f.transport().update_count(), 2);
        let key = f.session.engine().current_read_key().unwrap();
        let stored = FileSet::from_json(f.transport().body(&key).unwrap().as_bytes()).unwrap();
        assert_eq!(stored.active().unwrap().content, "from explicit save");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_focus_counter_is_an_error() {
        let transport = MemoryTransport::new();
        let files = FileSet::new(vec![
            CodeFile::new("a.py", "a").with_active_index(u64::MAX),
            CodeFile::new("b.py", "b"),
        ]);
        transport
            .insert(ReadKey::parse("00000000000000aa").unwrap(), None, &files)
            .unwrap();
        let f = fixture_with(transport, "/store/00000000000000aa").await;

        let err = f.session.change_file("b.py").await.unwrap_err();
        assert!(matches!(err, SyncError::Types(TypeError::ActiveIndexOverflow(_))));
        assert_eq!(f.session.files().active().unwrap().name, "a.py");
        assert_eq!(f.editor.get_value(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn close_flushes_pending_autosave() {
        let f = fixture("/").await;
        f.session.toggle_save(true).await.unwrap();
        f.type_text("pending");
        let transport_updates = {
            let Fixture { session, .. } = f;
            let engine = session.engine().clone();
            session.close().await;
            engine.transport().update_count()
        };
        assert_eq!(transport_updates, 1);
    }
}
