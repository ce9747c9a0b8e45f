//! Editor lifecycle state machine.
//!
//! [`Controller::handle`] takes one [`Event`] and returns the [`Effect`]s the
//! platform layer must carry out, in order. The controller never touches the
//! document itself; it asks an [`EditorHost`] for the facts it needs and keeps
//! per-element state (lazy, initializing, loaded) on its own.
//!
//! Timers are effects too: a scheduled timer comes back as
//! [`Event::TimerFired`] carrying the generation it was scheduled with, and
//! stale generations are ignored. That is how input debouncing and the
//! post-construction grace window work without the controller owning a
//! clock.

use smol_str::format_smolstr;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use web_time::Instant;

use mcefield_common::{FeatureSet, Settings};

use crate::align::enforce_single_align;
use crate::config::{Bootstrap, merge_config};
use crate::error::ControllerError;
use crate::host::EditorHost;
use crate::image::{ResizeResponse, is_hidpi, resize_url};
use crate::types::{EditorClass, EditorState, ElementId, ElementRef, wrapper_id};
use crate::upload::UploadTarget;

/// Quiet period after the last input before a change is propagated.
pub const INPUT_DEBOUNCE: Duration = Duration::from_millis(500);

/// How long an element still counts as initializing after its engine is
/// ready.
pub const INIT_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    InputDebounce,
    InitGrace,
}

/// An object the engine reports as resized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedObject {
    pub node_name: String,
    pub src: String,
    pub class_name: String,
    pub width: u32,
}

/// Delegated document events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Pointer, focus or touch on an element.
    Interact { target: ElementId },
    /// `image-edit` on an editor field.
    ImageEdit { field: ElementId },
    /// `sort-stop` on an editor field.
    FieldSortStop { field: ElementId },
    /// `reload` on a field wrapper.
    Reload { wrapper: ElementId },
    /// `reloaded` on a field wrapper.
    Reloaded { wrapper: ElementId },
    /// `sortstop` anywhere in the document.
    SortStop { container: ElementId },
    /// `clicklangtab` or `wiretabclick`: a tab became active.
    TabActivated { tab: ElementId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    DocumentReady,
    Init(ElementRef),
    EngineReady {
        id: ElementId,
    },
    /// Engine construction was rejected or could not be started.
    EngineFailed {
        id: ElementId,
        reason: String,
    },
    EngineDirty {
        id: ElementId,
    },
    EngineInput {
        id: ElementId,
    },
    ObjectResized {
        id: ElementId,
        object: ResizedObject,
    },
    ResizeCompleted {
        id: ElementId,
        src: String,
        result: Result<ResizeResponse, String>,
    },
    CommandExecuted {
        id: ElementId,
        command: String,
        value: Option<String>,
        /// Class list of the selected node when the command ran.
        node_class: Option<String>,
    },
    Destroy(Vec<ElementId>),
    Reset(Vec<ElementId>),
    Document(DocumentEvent),
    TimerFired {
        id: ElementId,
        timer: TimerKind,
        generation: u64,
    },
}

/// Everything needed to construct an engine for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub selector: smol_str::SmolStr,
    pub wrapper: Option<ElementId>,
    pub settings: Settings,
    pub features: FeatureSet,
    pub upload: Option<UploadTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AddClass {
        id: ElementId,
        class: EditorClass,
    },
    RemoveClass {
        id: ElementId,
        class: EditorClass,
    },
    /// Start asynchronous engine construction. The platform reports
    /// completion with [`Event::EngineReady`]. Config observers may amend the
    /// settings first.
    CreateEngine {
        id: ElementId,
        config: EngineConfig,
    },
    DestroyEngine {
        id: ElementId,
    },
    /// Subscribe to the engine's dirty, input and command notifications, and
    /// to object resizes when `resize` is set.
    WireEngine {
        id: ElementId,
        resize: bool,
    },
    NotifyReady {
        id: ElementId,
    },
    NotifyCommand {
        id: ElementId,
        command: String,
        value: Option<String>,
    },
    /// Fire `change` on a field wrapper.
    TriggerChange {
        wrapper: ElementId,
    },
    ScheduleTimer {
        id: ElementId,
        timer: TimerKind,
        generation: u64,
        delay: Duration,
    },
    RequestResize {
        id: ElementId,
        src: String,
        url: String,
    },
    SetImageSrc {
        id: ElementId,
        from: String,
        to: String,
    },
    SetNodeClass {
        id: ElementId,
        class_name: String,
    },
    ReportError(ControllerError),
}

/// Result of an init request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Document not ready; replayed on [`Event::DocumentReady`].
    Queued,
    /// Element tagged lazy.
    Deferred,
    Started,
    /// Already loaded or initializing.
    Skipped,
    Failed,
}

impl InitOutcome {
    pub fn is_success(self) -> bool {
        self != InitOutcome::Failed
    }
}

#[derive(Debug, Default)]
struct Record {
    state: EditorState,
    wrapper: Option<ElementId>,
    features: FeatureSet,
    input_generation: u64,
    grace_generation: u64,
    started: Option<Instant>,
    /// Destroyed while its engine was still being constructed.
    cancelled: bool,
    /// Init requested while a cancelled construction is still pending.
    restart: bool,
}

#[derive(Debug)]
pub struct Controller {
    bootstrap: Bootstrap,
    document_ready: bool,
    allow_lazy: bool,
    queue: VecDeque<ElementRef>,
    records: HashMap<ElementId, Record>,
    in_flight: HashSet<ElementId>,
    grace: HashSet<ElementId>,
}

impl Controller {
    pub fn new(bootstrap: Bootstrap) -> Self {
        Self {
            bootstrap,
            document_ready: false,
            allow_lazy: true,
            queue: VecDeque::new(),
            records: HashMap::new(),
            in_flight: HashSet::new(),
            grace: HashSet::new(),
        }
    }

    pub fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    pub fn is_document_ready(&self) -> bool {
        self.document_ready
    }

    pub fn state(&self, id: &str) -> EditorState {
        self.records.get(id).map(|r| r.state).unwrap_or_default()
    }

    /// Is this element being constructed, or inside its grace window?
    pub fn is_initializing(&self, id: &str) -> bool {
        self.in_flight.contains(id) || self.grace.contains(id)
    }

    /// Ids of elements in the given state.
    pub fn elements_in(&self, state: EditorState) -> Vec<ElementId> {
        let mut ids: Vec<_> = self
            .records
            .iter()
            .filter(|(_, record)| record.state == state)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Request initialization of one element.
    pub fn init(&mut self, target: ElementRef, host: &dyn EditorHost) -> (InitOutcome, Vec<Effect>) {
        let mut effects = Vec::new();
        let outcome = self.init_element(target, host, &mut effects);
        (outcome, effects)
    }

    pub fn handle(&mut self, event: Event, host: &dyn EditorHost) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            Event::DocumentReady => self.document_ready(host, &mut effects),
            Event::Init(target) => {
                self.init_element(target, host, &mut effects);
            }
            Event::EngineReady { id } => self.engine_ready(id, host, &mut effects),
            Event::EngineFailed { id, reason } => self.engine_failed(id, reason, host, &mut effects),
            Event::EngineDirty { id } => {
                if let Some(wrapper) = self.loaded_wrapper(&id) {
                    effects.push(Effect::TriggerChange { wrapper });
                }
            }
            Event::EngineInput { id } => {
                if let Some(record) = self.records.get_mut(&id)
                    && record.state == EditorState::Loaded
                {
                    record.input_generation += 1;
                    effects.push(Effect::ScheduleTimer {
                        id,
                        timer: TimerKind::InputDebounce,
                        generation: record.input_generation,
                        delay: INPUT_DEBOUNCE,
                    });
                }
            }
            Event::ObjectResized { id, object } => self.object_resized(id, object, &mut effects),
            Event::ResizeCompleted { id, src, result } => {
                self.resize_completed(id, src, result, &mut effects)
            }
            Event::CommandExecuted {
                id,
                command,
                value,
                node_class,
            } => self.command_executed(id, command, value, node_class, &mut effects),
            Event::Destroy(ids) => {
                for id in ids {
                    self.destroy_element(&id, &mut effects);
                }
            }
            Event::Reset(ids) => self.reset(ids, host, &mut effects),
            Event::Document(event) => self.document_event(event, host, &mut effects),
            Event::TimerFired {
                id,
                timer,
                generation,
            } => self.timer_fired(id, timer, generation, &mut effects),
        }
        effects
    }

    fn document_ready(&mut self, host: &dyn EditorHost, effects: &mut Vec<Effect>) {
        self.document_ready = true;
        tracing::debug!(queued = self.queue.len(), "document ready");
        while let Some(target) = self.queue.pop_front() {
            self.init_element(target, host, effects);
        }
    }

    fn init_element(
        &mut self,
        target: ElementRef,
        host: &dyn EditorHost,
        effects: &mut Vec<Effect>,
    ) -> InitOutcome {
        if !self.document_ready {
            tracing::debug!(target = %target, "init queued until document ready");
            self.queue.push_back(target);
            return InitOutcome::Queued;
        }

        let Some(id) = host.resolve(&target) else {
            tracing::error!(target = %target, "cannot find element to init editor");
            if let ElementRef::Id(id) = &target {
                self.in_flight.remove(id);
            }
            effects.push(Effect::ReportError(ControllerError::NotFound {
                target: target.to_string(),
            }));
            return InitOutcome::Failed;
        };

        if self.in_flight.contains(&id) {
            if let Some(record) = self.records.get_mut(&id)
                && record.cancelled
            {
                record.restart = true;
                tracing::debug!(id = %id, "init queued until the cancelled engine settles");
                return InitOutcome::Queued;
            }
            tracing::debug!(id = %id, "init skipped, already initializing");
            return InitOutcome::Skipped;
        }

        let allow_lazy = self.allow_lazy;
        let record = self.records.entry(id.clone()).or_default();
        match record.state {
            EditorState::Loaded => {
                tracing::debug!(id = %id, "init skipped, already loaded");
                return InitOutcome::Skipped;
            }
            EditorState::Lazy => {
                effects.push(Effect::RemoveClass {
                    id: id.clone(),
                    class: EditorClass::Lazy,
                });
            }
            _ if allow_lazy && !host.is_visible(&id) && !host.is_inline(&id) => {
                record.state = EditorState::Lazy;
                tracing::debug!(id = %id, "init deferred until visible");
                effects.push(Effect::AddClass {
                    id,
                    class: EditorClass::Lazy,
                });
                return InitOutcome::Deferred;
            }
            _ => {}
        }

        let by_name = wrapper_id(&id);
        let wrapper = if host.exists(&by_name) {
            Some(by_name)
        } else {
            host.closest_wrapper(&id)
        };
        let data = wrapper
            .as_ref()
            .map(|wrapper| host.wrapper_data(wrapper))
            .unwrap_or_default();

        let config = EngineConfig {
            selector: format_smolstr!("#{id}"),
            wrapper: wrapper.clone(),
            settings: merge_config(&self.bootstrap, &data),
            features: data.features,
            upload: data.upload_target(),
        };

        let record = self.records.entry(id.clone()).or_default();
        record.state = EditorState::Initializing;
        record.wrapper = wrapper;
        record.features = data.features;
        record.started = Some(Instant::now());
        self.in_flight.insert(id.clone());

        tracing::debug!(id = %id, config = %data.config_name, "init");
        effects.push(Effect::CreateEngine { id, config });
        InitOutcome::Started
    }

    fn engine_ready(&mut self, id: ElementId, host: &dyn EditorHost, effects: &mut Vec<Effect>) {
        let Some(record) = self.records.get_mut(&id) else {
            tracing::warn!(id = %id, "engine ready for an unknown element");
            return;
        };
        if record.cancelled {
            record.cancelled = false;
            let restart = std::mem::take(&mut record.restart);
            self.in_flight.remove(&id);
            tracing::debug!(id = %id, "engine ready after destroy, discarding it");
            effects.push(Effect::DestroyEngine { id: id.clone() });
            if restart {
                self.init_element(ElementRef::Id(id), host, effects);
            }
            return;
        }
        if record.state == EditorState::Loaded {
            tracing::debug!(id = %id, "engine ready on an element that is already loaded");
        }
        record.state = EditorState::Loaded;
        record.grace_generation += 1;
        if let Some(started) = record.started.take() {
            tracing::debug!(id = %id, elapsed = ?started.elapsed(), "engine ready");
        }
        let generation = record.grace_generation;
        let resize = record.features.contains(FeatureSet::IMG_RESIZE);

        self.in_flight.remove(&id);
        self.grace.insert(id.clone());

        effects.push(Effect::AddClass {
            id: id.clone(),
            class: EditorClass::Loaded,
        });
        effects.push(Effect::ScheduleTimer {
            id: id.clone(),
            timer: TimerKind::InitGrace,
            generation,
            delay: INIT_GRACE,
        });
        effects.push(Effect::WireEngine {
            id: id.clone(),
            resize,
        });
        effects.push(Effect::NotifyReady { id });
    }

    fn engine_failed(
        &mut self,
        id: ElementId,
        reason: String,
        host: &dyn EditorHost,
        effects: &mut Vec<Effect>,
    ) {
        self.in_flight.remove(&id);
        self.grace.remove(&id);
        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        let restart = record.cancelled && std::mem::take(&mut record.restart);
        record.cancelled = false;
        record.restart = false;
        record.started = None;
        if record.state == EditorState::Initializing {
            record.state = EditorState::Unloaded;
        }
        tracing::warn!(id = %id, reason = %reason, "engine failed to start");
        effects.push(Effect::ReportError(ControllerError::EngineFailed {
            id: id.to_string(),
            reason,
        }));
        if restart {
            self.init_element(ElementRef::Id(id), host, effects);
        }
    }

    fn loaded_wrapper(&self, id: &str) -> Option<ElementId> {
        self.records
            .get(id)
            .filter(|record| record.state == EditorState::Loaded)
            .and_then(|record| record.wrapper.clone())
    }

    fn timer_fired(
        &mut self,
        id: ElementId,
        timer: TimerKind,
        generation: u64,
        effects: &mut Vec<Effect>,
    ) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        match timer {
            TimerKind::InitGrace if record.grace_generation == generation => {
                self.grace.remove(&id);
            }
            TimerKind::InputDebounce if record.input_generation == generation => {
                if let Some(wrapper) = self.loaded_wrapper(&id) {
                    effects.push(Effect::TriggerChange { wrapper });
                }
            }
            _ => {}
        }
    }

    fn object_resized(&mut self, id: ElementId, object: ResizedObject, effects: &mut Vec<Effect>) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        if record.state != EditorState::Loaded
            || !record.features.contains(FeatureSet::IMG_RESIZE)
            || !object.node_name.eq_ignore_ascii_case("img")
        {
            return;
        }
        let url = resize_url(
            &self.bootstrap.admin_url,
            &object.src,
            object.width,
            is_hidpi(&object.class_name),
        );
        tracing::debug!(id = %id, width = object.width, url = %url, "resizing image");
        effects.push(Effect::RequestResize {
            id,
            src: object.src,
            url,
        });
    }

    fn resize_completed(
        &mut self,
        id: ElementId,
        src: String,
        result: Result<ResizeResponse, String>,
        effects: &mut Vec<Effect>,
    ) {
        if self.state(&id) != EditorState::Loaded {
            tracing::debug!(id = %id, "resize finished after the editor went away");
            return;
        }
        match result {
            Ok(response) => {
                tracing::debug!(id = %id, width = response.width, src = %response.src, "image resized");
                effects.push(Effect::SetImageSrc {
                    id,
                    from: src,
                    to: response.src,
                });
            }
            Err(message) => {
                tracing::warn!(id = %id, src = %src, error = %message, "image resize failed");
            }
        }
    }

    fn command_executed(
        &mut self,
        id: ElementId,
        command: String,
        value: Option<String>,
        node_class: Option<String>,
        effects: &mut Vec<Effect>,
    ) {
        if command == "mceFocus" {
            return;
        }
        tracing::debug!(id = %id, command = %command, "command");

        if command == "mceToggleFormat"
            && let Some(applied) = value.as_deref().filter(|v| v.starts_with("align"))
            && let Some(class_name) = node_class.as_deref()
            && let Some(class_name) = enforce_single_align(class_name, applied)
        {
            effects.push(Effect::SetNodeClass {
                id: id.clone(),
                class_name,
            });
        }

        effects.push(Effect::NotifyCommand { id, command, value });
    }

    fn destroy_element(&mut self, id: &ElementId, effects: &mut Vec<Effect>) {
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        match record.state {
            EditorState::Loaded => {}
            EditorState::Initializing if !record.cancelled => {
                // The engine is torn down once it reports back.
                record.state = EditorState::Unloaded;
                record.cancelled = true;
                record.restart = false;
                record.input_generation += 1;
                tracing::debug!(id = %id, "destroy requested while the engine is starting");
                return;
            }
            _ => return,
        }
        record.state = EditorState::Unloaded;
        record.input_generation += 1;
        self.grace.remove(id);

        tracing::debug!(id = %id, "destroy editor");
        effects.push(Effect::RemoveClass {
            id: id.clone(),
            class: EditorClass::Loaded,
        });
        effects.push(Effect::RemoveClass {
            id: id.clone(),
            class: EditorClass::Lazy,
        });
        effects.push(Effect::DestroyEngine { id: id.clone() });
    }

    fn reset(&mut self, ids: Vec<ElementId>, host: &dyn EditorHost, effects: &mut Vec<Effect>) {
        for id in &ids {
            self.destroy_element(id, effects);
        }
        for id in ids {
            if self.state(&id) != EditorState::Loaded {
                self.init_element(ElementRef::Id(id), host, effects);
            }
        }
    }

    fn loaded_within(&self, container: &ElementId, host: &dyn EditorHost) -> Vec<ElementId> {
        host.editors_within(container)
            .into_iter()
            .filter(|id| self.state(id) == EditorState::Loaded)
            .collect()
    }

    fn document_event(&mut self, event: DocumentEvent, host: &dyn EditorHost, effects: &mut Vec<Effect>) {
        match event {
            DocumentEvent::Interact { target } => {
                if host.is_inline(&target)
                    && self.state(&target) != EditorState::Loaded
                    && !self.is_initializing(&target)
                {
                    self.init_element(ElementRef::Id(target), host, effects);
                }
            }
            DocumentEvent::ImageEdit { field } | DocumentEvent::FieldSortStop { field } => {
                let editors: Vec<_> = self
                    .loaded_within(&field, host)
                    .into_iter()
                    .filter(|id| !host.is_inline(id))
                    .collect();
                if !editors.is_empty() {
                    tracing::debug!(field = %field, count = editors.len(), "reset editors");
                    self.allow_lazy = false;
                    self.reset(editors, host, effects);
                    self.allow_lazy = true;
                }
            }
            DocumentEvent::Reload { wrapper } => {
                for id in self.loaded_within(&wrapper, host) {
                    self.destroy_element(&id, effects);
                }
            }
            DocumentEvent::Reloaded { wrapper } => {
                let editors: Vec<_> = host
                    .editors_within(&wrapper)
                    .into_iter()
                    .filter(|id| self.state(id) == EditorState::Unloaded)
                    .collect();
                for id in editors {
                    self.init_element(ElementRef::Id(id), host, effects);
                }
            }
            DocumentEvent::SortStop { container } => {
                let editors = self.loaded_within(&container, host);
                if !editors.is_empty() {
                    self.reset(editors, host, effects);
                }
            }
            DocumentEvent::TabActivated { tab } => {
                let editors: Vec<_> = host
                    .editors_within(&tab)
                    .into_iter()
                    .filter(|id| self.state(id) == EditorState::Lazy && host.is_visible(id))
                    .collect();
                for id in editors {
                    self.init_element(ElementRef::Id(id), host, effects);
                }
            }
        }
    }
}
