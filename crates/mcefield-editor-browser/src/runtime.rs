//! Runs the controller against the live document.
//!
//! The controller sits in a `RefCell` and is only borrowed while it computes
//! effects; effects run after the borrow is released, so callbacks they
//! trigger (change handlers, observers, engine notifications) may dispatch
//! again.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo_events::EventListener;
use gloo_timers::future::TimeoutFuture;
use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Document, Element};

use mcefield_editor_core::{
    Bootstrap, Controller, DocumentEvent, EditorClass, EditorState, Effect, ElementId, ElementRef,
    EngineConfig, Event, InitOutcome, ResizedObject,
};

use crate::dom::DomHost;
use crate::engine::{self, BlobInfo, EngineEditor, EngineEvent};
use crate::events::{DOCUMENT_EVENTS, document_event};
use crate::resize::fetch_resize;
use crate::upload::upload_image;

type EngineListener = Closure<dyn FnMut(EngineEvent)>;
type UploadHandler = Closure<dyn FnMut(BlobInfo, Function) -> Promise>;

/// Callbacks registered from page scripts.
#[derive(Default)]
pub struct Observers {
    setup: RefCell<Vec<Function>>,
    config: RefCell<Vec<Function>>,
    ready: RefCell<Vec<Function>>,
    command: RefCell<Vec<Function>>,
}

impl Observers {
    /// Called with the editor before it is rendered.
    pub fn on_setup(&self, callback: Function) {
        self.setup.borrow_mut().push(callback);
    }

    /// Called with `(settings, element, wrapper)` before an engine is
    /// created. The settings object may be modified in place.
    pub fn on_config(&self, callback: Function) {
        self.config.borrow_mut().push(callback);
    }

    /// Called with the editor once it is ready.
    pub fn on_ready(&self, callback: Function) {
        self.ready.borrow_mut().push(callback);
    }

    /// Called with `(editor, command, value)` for every executed command.
    pub fn on_command(&self, callback: Function) {
        self.command.borrow_mut().push(callback);
    }

    fn notify(list: &RefCell<Vec<Function>>, args: &[&JsValue]) {
        let callbacks = list.borrow().clone();
        for callback in callbacks {
            let result = match args {
                [a] => callback.call1(&JsValue::NULL, a),
                [a, b] => callback.call2(&JsValue::NULL, a, b),
                [a, b, c] => callback.call3(&JsValue::NULL, a, b, c),
                _ => callback.call0(&JsValue::NULL),
            };
            if let Err(err) = result {
                tracing::warn!(error = ?err, "observer callback threw");
            }
        }
    }
}

/// Per-engine closures, released when the engine is destroyed.
#[derive(Default)]
struct Wiring {
    listeners: Vec<(&'static str, EngineListener)>,
    upload: Option<UploadHandler>,
}

pub struct Runtime {
    controller: RefCell<Controller>,
    host: DomHost,
    observers: Observers,
    wiring: RefCell<HashMap<ElementId, Wiring>>,
    document_listeners: RefCell<Vec<EventListener>>,
    this: Weak<Runtime>,
}

impl Runtime {
    pub fn new(bootstrap: Bootstrap, document: Document) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            controller: RefCell::new(Controller::new(bootstrap)),
            host: DomHost::new(document),
            observers: Observers::default(),
            wiring: RefCell::new(HashMap::new()),
            document_listeners: RefCell::new(Vec::new()),
            this: this.clone(),
        })
    }

    pub fn host(&self) -> &DomHost {
        &self.host
    }

    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    pub fn debug(&self) -> bool {
        self.controller.borrow().bootstrap().debug
    }

    pub fn state(&self, id: &str) -> EditorState {
        self.controller.borrow().state(id)
    }

    pub fn is_initializing(&self, id: &str) -> bool {
        self.controller.borrow().is_initializing(id)
    }

    /// Mark the document ready now, or once `DOMContentLoaded` fires.
    pub fn start(&self) {
        let document = self.host.document();
        if document.ready_state() != "loading" {
            self.document_ready();
            return;
        }
        let this = self.this.clone();
        let listener = EventListener::once(document, "DOMContentLoaded", move |_| {
            if let Some(runtime) = this.upgrade() {
                runtime.document_ready();
            }
        });
        self.document_listeners.borrow_mut().push(listener);
    }

    fn document_ready(&self) {
        if self.controller.borrow().is_document_ready() {
            return;
        }
        self.dispatch(Event::DocumentReady);
        self.attach_document_events();

        if self.debug() {
            let count = |class: EditorClass| {
                self.host
                    .document()
                    .query_selector_all(&format!(".{}", class.as_str()))
                    .map(|nodes| nodes.length())
                    .unwrap_or(0)
            };
            tracing::debug!(
                normal = count(EditorClass::Normal),
                inline = count(EditorClass::Inline),
                lazy = count(EditorClass::Lazy),
                loaded = count(EditorClass::Loaded),
                "editors on page"
            );
        }
    }

    fn attach_document_events(&self) {
        let mut listeners = self.document_listeners.borrow_mut();
        for name in DOCUMENT_EVENTS {
            let this = self.this.clone();
            listeners.push(EventListener::new(self.host.document(), name, move |event| {
                if let Some(runtime) = this.upgrade() {
                    runtime.document_event(name, event);
                }
            }));
        }
    }

    fn document_event(&self, name: &str, event: &web_sys::Event) {
        if let Some(event) = document_event(name, event, &self.host) {
            if !matches!(event, DocumentEvent::Interact { .. }) {
                tracing::debug!(event = name, "document event");
            }
            self.dispatch(Event::Document(event));
        }
        self.host.clear_anonymous();
    }

    pub fn init(&self, target: &str) -> InitOutcome {
        let (outcome, effects) = self
            .controller
            .borrow_mut()
            .init(ElementRef::parse(target), &self.host);
        self.run(effects);
        outcome
    }

    pub fn destroy(&self, ids: Vec<ElementId>) {
        self.dispatch(Event::Destroy(ids));
    }

    pub fn reset(&self, ids: Vec<ElementId>) {
        self.dispatch(Event::Reset(ids));
    }

    pub fn dispatch(&self, event: Event) {
        let effects = self.controller.borrow_mut().handle(event, &self.host);
        self.run(effects);
    }

    fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::AddClass { id, class } => self.host.add_class(&id, class),
                Effect::RemoveClass { id, class } => self.host.remove_class(&id, class),
                Effect::CreateEngine { id, config } => self.create_engine(id, config),
                Effect::DestroyEngine { id } => self.destroy_engine(&id),
                Effect::WireEngine { id, resize } => self.wire_engine(id, resize),
                Effect::NotifyReady { id } => {
                    if let Some(editor) = engine::get(&id) {
                        Observers::notify(&self.observers.ready, &[&editor.into()]);
                    }
                }
                Effect::NotifyCommand { id, command, value } => {
                    if let Some(editor) = engine::get(&id) {
                        let value = value.map(JsValue::from).unwrap_or(JsValue::UNDEFINED);
                        Observers::notify(
                            &self.observers.command,
                            &[&editor.into(), &JsValue::from_str(&command), &value],
                        );
                    }
                }
                Effect::TriggerChange { wrapper } => {
                    if let Err(err) = self.host.trigger(&wrapper, "change", None) {
                        tracing::warn!(wrapper = %wrapper, error = ?err, "change event failed");
                    }
                }
                Effect::ScheduleTimer {
                    id,
                    timer,
                    generation,
                    delay,
                } => {
                    let this = self.this.clone();
                    let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
                    spawn_local(async move {
                        TimeoutFuture::new(millis).await;
                        if let Some(runtime) = this.upgrade() {
                            runtime.dispatch(Event::TimerFired {
                                id,
                                timer,
                                generation,
                            });
                        }
                    });
                }
                Effect::RequestResize { id, src, url } => {
                    let this = self.this.clone();
                    spawn_local(async move {
                        let result = fetch_resize(&url).await;
                        if let Some(runtime) = this.upgrade() {
                            runtime.dispatch(Event::ResizeCompleted { id, src, result });
                        }
                    });
                }
                Effect::SetImageSrc { id, from, to } => set_image_src(&id, &from, &to),
                Effect::SetNodeClass { id, class_name } => {
                    if let Some(node) = engine::get(&id).and_then(|editor| editor.selection().node()) {
                        node.set_class_name(&class_name);
                    }
                }
                Effect::ReportError(err) => {
                    web_sys::console::error_1(&JsValue::from_str(&err.to_string()));
                }
            }
        }
    }

    fn create_engine(&self, id: ElementId, config: EngineConfig) {
        let settings = match JsValue::from_serde(&config.settings) {
            Ok(settings) => settings,
            Err(err) => {
                self.engine_failed(id, format!("cannot encode editor settings: {err}"));
                return;
            }
        };

        let element = self.host.element(&id).map(JsValue::from).unwrap_or(JsValue::NULL);
        let wrapper = config
            .wrapper
            .as_deref()
            .and_then(|wrapper| self.host.element(wrapper))
            .map(JsValue::from)
            .unwrap_or(JsValue::NULL);
        Observers::notify(&self.observers.config, &[&settings, &element, &wrapper]);

        let set = |key: &str, value: &JsValue| {
            if let Err(err) = Reflect::set(&settings, &JsValue::from_str(key), value) {
                tracing::warn!(key, error = ?err, "cannot set engine option");
            }
        };
        set("selector", &JsValue::from_str(&config.selector));

        let this = self.this.clone();
        set(
            "setup",
            &Closure::once_into_js(move |editor: EngineEditor| {
                if let Some(runtime) = this.upgrade() {
                    Observers::notify(&runtime.observers.setup, &[&editor.into()]);
                }
            }),
        );

        let this = self.this.clone();
        set(
            "init_instance_callback",
            &Closure::once_into_js(move |editor: EngineEditor| {
                if let Some(runtime) = this.upgrade() {
                    runtime.dispatch(Event::EngineReady {
                        id: editor.id().into(),
                    });
                }
            }),
        );

        if let Some(target) = config.upload {
            let this = self.this.clone();
            let admin_url = self.controller.borrow().bootstrap().admin_url.clone();
            let handler: UploadHandler = Closure::wrap(Box::new(
                move |blob: BlobInfo, progress: Function| -> Promise {
                    match this.upgrade() {
                        Some(runtime) => {
                            upload_image(&runtime.host, &target, &admin_url, &blob, progress)
                        }
                        None => Promise::reject(&JsValue::from_str("editor runtime is gone")),
                    }
                },
            ));
            set("images_upload_handler", handler.as_ref());
            self.wiring.borrow_mut().entry(id.clone()).or_default().upload = Some(handler);
        }

        match engine::init(&settings) {
            Ok(promise) => {
                let this = self.this.clone();
                spawn_local(async move {
                    if let Err(err) = JsFuture::from(promise).await
                        && let Some(runtime) = this.upgrade()
                    {
                        runtime.engine_failed(id, describe(&err));
                    }
                });
            }
            Err(err) => {
                let reason = format!("editing engine is not available: {}", describe(&err));
                self.engine_failed(id, reason);
            }
        }
    }

    fn engine_failed(&self, id: ElementId, reason: String) {
        self.wiring.borrow_mut().remove(&id);
        self.dispatch(Event::EngineFailed { id, reason });
    }

    fn destroy_engine(&self, id: &ElementId) {
        let wiring = self.wiring.borrow_mut().remove(id);
        let Some(editor) = engine::get(id) else {
            tracing::debug!(id = %id, "no engine to destroy");
            return;
        };
        if let Some(wiring) = &wiring {
            for (name, listener) in &wiring.listeners {
                editor.off(name, listener.as_ref().unchecked_ref());
            }
        }
        editor.destroy();
    }

    fn listener(
        &self,
        id: &ElementId,
        map: impl Fn(ElementId, EngineEvent) -> Option<Event> + 'static,
    ) -> EngineListener {
        let this = self.this.clone();
        let id = id.clone();
        Closure::wrap(Box::new(move |event: EngineEvent| {
            if let Some(runtime) = this.upgrade()
                && let Some(event) = map(id.clone(), event)
            {
                runtime.dispatch(event);
            }
        }))
    }

    fn wire_engine(&self, id: ElementId, resize: bool) {
        let Some(editor) = engine::get(&id) else {
            tracing::warn!(id = %id, "ready editor is not registered with the engine");
            return;
        };

        let mut listeners = vec![
            ("Dirty", self.listener(&id, |id, _| Some(Event::EngineDirty { id }))),
            ("input", self.listener(&id, |id, _| Some(Event::EngineInput { id }))),
        ];

        listeners.push(("ExecCommand", {
            let editor = editor.clone();
            self.listener(&id, move |id, event| {
                Some(Event::CommandExecuted {
                    id,
                    command: event.command().unwrap_or_default(),
                    value: event.value().as_string(),
                    node_class: editor.selection().node().map(|node| node.class_name()),
                })
            })
        }));

        if resize {
            listeners.push((
                "ObjectResized",
                self.listener(&id, |id, event| {
                    let target = event.target()?;
                    Some(Event::ObjectResized {
                        id,
                        object: ResizedObject {
                            node_name: target.node_name(),
                            src: string_property(&target, "src").unwrap_or_default(),
                            class_name: target.class_name(),
                            width: event.width().unwrap_or_default().max(0.0) as u32,
                        },
                    })
                }),
            ));
        }

        for (name, listener) in &listeners {
            editor.on(name, listener.as_ref().unchecked_ref());
        }
        self.wiring.borrow_mut().entry(id).or_default().listeners = listeners;
    }
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Read a string property. Elements inside the editor frame belong to another
/// realm, so typed casts would fail their `instanceof` checks.
fn string_property(element: &Element, name: &str) -> Option<String> {
    Reflect::get(element, &JsValue::from_str(name))
        .ok()
        .and_then(|value| value.as_string())
}

fn set_image_src(id: &str, from: &str, to: &str) {
    let Some(editor) = engine::get(id) else {
        return;
    };
    let Some(images) = editor.body().and_then(|body| body.query_selector_all("img").ok()) else {
        return;
    };
    let image = (0..images.length())
        .filter_map(|i| images.item(i))
        .map(|node| node.unchecked_into::<Element>())
        .find(|image| string_property(image, "src").as_deref() == Some(from));
    match image {
        Some(image) => {
            editor.dom().set_attrib(&image, "src", to);
            tracing::debug!(id, src = to, "resized image swapped in");
        }
        None => tracing::debug!(id, src = from, "resized image is no longer in the editor"),
    }
}
