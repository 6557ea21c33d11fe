//! WebXR bridge
//!
//! The WebXR API is reached through `js_sys::Reflect` so no unstable web-sys
//! bindings are needed. Async results land in [`XrInbox`] slots that Bevy
//! systems drain each frame. The XR frame callback only samples poses; all
//! controller state changes happen in Bevy systems.
//!
//! The JS handles (session, spaces, hit-test source, anchor) are not `Send`
//! and live in the non-send [`XrBridge`].

use bevy::prelude::*;
use cera_core::{
    AnchorId, RigidPose, SessionCapabilities, SessionEvent, SessionInit, ViewProjection,
};
use js_sys::{Array, Float32Array, Function, Object, Promise, Reflect};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};

const SESSION_MODE: &str = "immersive-ar";

/// Poses sampled in the most recent XR frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XrFrameSample {
    /// Increments every XR frame; zero before the first one
    pub sequence: u64,
    pub viewer: Option<RigidPose>,
    /// Projection of the viewer's first (only, on handheld) view
    pub projection: Option<ViewProjection>,
    /// First hit-test result
    pub hit: Option<RigidPose>,
    pub anchor: Option<RigidPose>,
}

/// Slots written by async tasks and the XR frame callback
#[derive(Resource, Clone, Default)]
pub struct XrInbox {
    events: Arc<Mutex<Vec<SessionEvent>>>,
    selects: Arc<Mutex<u32>>,
    anchors: Arc<Mutex<Vec<Result<AnchorId, String>>>>,
    frame: Arc<Mutex<XrFrameSample>>,
}

impl XrInbox {
    pub fn push_event(&self, event: SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn take_events(&self) -> Vec<SessionEvent> {
        self.events
            .try_lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    pub fn push_select(&self) {
        if let Ok(mut selects) = self.selects.lock() {
            *selects += 1;
        }
    }

    /// Number of `select` events since the last call
    pub fn take_selects(&self) -> u32 {
        self.selects
            .try_lock()
            .map(|mut selects| std::mem::take(&mut *selects))
            .unwrap_or(0)
    }

    pub(crate) fn push_anchor_result(&self, result: Result<AnchorId, String>) {
        if let Ok(mut anchors) = self.anchors.lock() {
            anchors.push(result);
        }
    }

    pub fn take_anchor_results(&self) -> Vec<Result<AnchorId, String>> {
        self.anchors
            .try_lock()
            .map(|mut anchors| std::mem::take(&mut *anchors))
            .unwrap_or_default()
    }

    pub(crate) fn store_frame(&self, sample: XrFrameSample) {
        if let Ok(mut frame) = self.frame.lock() {
            *frame = sample;
        }
    }

    pub fn latest_frame(&self) -> Option<XrFrameSample> {
        self.frame.try_lock().ok().map(|frame| *frame)
    }

    /// Forget everything left over from a previous session
    pub fn clear(&self) {
        self.take_events();
        self.take_selects();
        self.take_anchor_results();
        self.store_frame(XrFrameSample::default());
    }
}

type FrameCallback = Closure<dyn FnMut(f64, JsValue)>;

#[derive(Default)]
struct XrHandles {
    /// Bumped whenever the session is ended from our side; async work
    /// started under an older generation discards its result
    generation: u32,
    session: Option<JsValue>,
    local_space: Option<JsValue>,
    hit_test_source: Option<JsValue>,
    anchor: Option<JsValue>,
    pending_anchor: Option<RigidPose>,
    next_anchor_id: u32,
    frame_loop: Option<Rc<RefCell<Option<FrameCallback>>>>,
}

/// Owner of the live WebXR objects
pub struct XrBridge {
    inbox: XrInbox,
    handles: Rc<RefCell<XrHandles>>,
}

impl XrBridge {
    pub fn new(inbox: XrInbox) -> Self {
        Self {
            inbox,
            handles: Rc::new(RefCell::new(XrHandles::default())),
        }
    }

    /// Ask whether an immersive AR session can run here
    pub fn check_support(&self) {
        let Some(xr) = navigator_xr() else {
            self.inbox.push_event(SessionEvent::ApiMissing);
            return;
        };

        let inbox = self.inbox.clone();
        spawn_local(async move {
            let supported = match is_session_supported(&xr).await {
                Ok(supported) => supported,
                Err(e) => {
                    warn!("isSessionSupported failed: {}", describe(&e));
                    false
                }
            };
            inbox.push_event(SessionEvent::SupportChecked(supported));
        });
    }

    pub fn request_session(&self, init: SessionInit) {
        let Some(xr) = navigator_xr() else {
            self.inbox.push_event(SessionEvent::SessionFailed(
                "navigator.xr disappeared".to_string(),
            ));
            return;
        };

        let generation = self.handles.borrow().generation;
        let handles = self.handles.clone();
        let inbox = self.inbox.clone();
        spawn_local(async move {
            let event = match start_session(&xr, &init, &handles, &inbox, generation).await {
                Ok(caps) => SessionEvent::SessionStarted(caps),
                Err(e) => SessionEvent::SessionFailed(describe(&e)),
            };
            if handles.borrow().generation == generation {
                inbox.push_event(event);
            }
        });
    }

    /// Queue an anchor at `pose`; it is created in the next XR frame
    pub fn request_anchor(&self, pose: RigidPose) {
        self.handles.borrow_mut().pending_anchor = Some(pose);
    }

    /// End the session, including one whose request is still in flight
    pub fn end_session(&self) {
        let session = {
            let mut handles = self.handles.borrow_mut();
            handles.generation = handles.generation.wrapping_add(1);
            handles.local_space = None;
            handles.pending_anchor = None;
            if let Some(source) = handles.hit_test_source.take() {
                let _ = call_method(&source, "cancel", &[]);
            }
            if let Some(anchor) = handles.anchor.take() {
                let _ = call_method(&anchor, "delete", &[]);
            }
            handles.session.take()
        };

        let Some(session) = session else {
            return;
        };
        info!("Ending AR session");
        match call_method(&session, "end", &[]) {
            Ok(promise) => spawn_local(async move {
                if let Err(e) = await_promise(promise).await {
                    debug!("XRSession.end rejected: {}", describe(&e));
                }
            }),
            Err(e) => warn!("XRSession.end failed: {}", describe(&e)),
        }
    }
}

fn get(target: &JsValue, key: &str) -> Result<JsValue, JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
}

fn set(target: &JsValue, key: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
}

fn call_method(target: &JsValue, name: &str, args: &[&JsValue]) -> Result<JsValue, JsValue> {
    let method: Function = get(target, name)?.dyn_into()?;
    let args: Array = args.iter().copied().collect();
    Reflect::apply(&method, target, &args)
}

fn construct(class: &str, args: &[&JsValue]) -> Result<JsValue, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let constructor: Function = get(&window, class)?.dyn_into()?;
    let args: Array = args.iter().copied().collect();
    Reflect::construct(&constructor, &args)
}

async fn await_promise(value: JsValue) -> Result<JsValue, JsValue> {
    let promise: Promise = value.dyn_into()?;
    JsFuture::from(promise).await
}

fn is_present(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

/// Readable text for a rejected promise or thrown value
fn describe(error: &JsValue) -> String {
    error
        .as_string()
        .or_else(|| get(error, "message").ok().and_then(|m| m.as_string()))
        .unwrap_or_else(|| format!("{:?}", error))
}

fn navigator_xr() -> Option<JsValue> {
    let window = web_sys::window()?;
    let xr = get(&window.navigator(), "xr").ok()?;
    is_present(&xr).then_some(xr)
}

/// `XRPose.transform.matrix` as a rigid pose
fn matrix_pose(pose: &JsValue) -> Option<RigidPose> {
    if !is_present(pose) {
        return None;
    }
    let transform = get(pose, "transform").ok()?;
    let matrix: Float32Array = get(&transform, "matrix").ok()?.dyn_into().ok()?;
    RigidPose::from_slice(&matrix.to_vec())
}

fn view_projection(viewer_pose: &JsValue) -> Option<ViewProjection> {
    if !is_present(viewer_pose) {
        return None;
    }
    let views = get(viewer_pose, "views").ok().filter(Array::is_array)?;
    let view = Array::from(&views).get(0);
    if !is_present(&view) {
        return None;
    }
    let matrix: Float32Array = get(&view, "projectionMatrix").ok()?.dyn_into().ok()?;
    ViewProjection::from_slice(&matrix.to_vec())
}

async fn is_session_supported(xr: &JsValue) -> Result<bool, JsValue> {
    let promise = call_method(xr, "isSessionSupported", &[&JsValue::from_str(SESSION_MODE)])?;
    Ok(await_promise(promise).await?.as_bool().unwrap_or(false))
}

fn session_options(init: &SessionInit) -> Result<Object, JsValue> {
    let options = Object::new();
    let required: Array = init
        .required_features
        .iter()
        .map(|f| JsValue::from_str(f))
        .collect();
    let optional: Array = init
        .optional_features
        .iter()
        .map(|f| JsValue::from_str(f))
        .collect();
    set(&options, "requiredFeatures", &required)?;
    set(&options, "optionalFeatures", &optional)?;

    if let Some(root_id) = &init.dom_overlay_root {
        let root = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(root_id));
        match root {
            Some(root) => {
                let overlay = Object::new();
                set(&overlay, "root", &root)?;
                set(&options, "domOverlay", &overlay)?;
            }
            None => warn!("DOM overlay root #{} not found", root_id),
        }
    }
    Ok(options)
}

/// XR frames only fire with a base layer; ours renders nothing and leaves
/// the camera feed visible under the DOM overlay
fn install_base_layer(session: &JsValue) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas = document.create_element("canvas")?;

    let attributes = Object::new();
    set(&attributes, "xrCompatible", &JsValue::TRUE)?;
    set(&attributes, "alpha", &JsValue::TRUE)?;
    let gl = call_method(&canvas, "getContext", &[&JsValue::from_str("webgl2"), &attributes])?;
    if !is_present(&gl) {
        return Err(JsValue::from_str("WebGL2 context unavailable for XR layer"));
    }

    let layer = construct("XRWebGLLayer", &[session, &gl])?;
    let render_state = Object::new();
    set(&render_state, "baseLayer", &layer)?;
    call_method(session, "updateRenderState", &[&render_state])?;
    Ok(())
}

/// Optional features the platform granted
fn granted_capabilities(session: &JsValue, init: &SessionInit) -> SessionCapabilities {
    if let Ok(features) = get(session, "enabledFeatures") {
        if Array::is_array(&features) {
            let features: Vec<String> = Array::from(&features)
                .iter()
                .filter_map(|f| f.as_string())
                .collect();
            return SessionCapabilities::from_granted(&features);
        }
    }

    // Older runtimes do not report enabledFeatures
    let requested_anchors = init
        .optional_features
        .iter()
        .any(|f| f == cera_core::session::FEATURE_ANCHORS);
    let frame_has_anchors = web_sys::window()
        .and_then(|window| get(&window, "XRFrame").ok())
        .and_then(|class| get(&class, "prototype").ok())
        .and_then(|proto| Reflect::has(&proto, &JsValue::from_str("createAnchor")).ok())
        .unwrap_or(false);
    let dom_overlay = get(session, "domOverlayState")
        .map(|state| is_present(&state))
        .unwrap_or(false);

    SessionCapabilities {
        anchors: requested_anchors && frame_has_anchors,
        dom_overlay,
    }
}

fn is_current(handles: &RefCell<XrHandles>, generation: u32) -> bool {
    handles.borrow().generation == generation
}

async fn start_session(
    xr: &JsValue,
    init: &SessionInit,
    handles: &Rc<RefCell<XrHandles>>,
    inbox: &XrInbox,
    generation: u32,
) -> Result<SessionCapabilities, JsValue> {
    let options = session_options(init)?;
    let request = call_method(
        xr,
        "requestSession",
        &[&JsValue::from_str(SESSION_MODE), &options],
    )?;
    let session = await_promise(request).await?;

    match configure_session(&session, init, handles, inbox, generation).await {
        Ok(caps) => Ok(caps),
        Err(e) => {
            // Cancelled or half-configured: do not leave it running
            let _ = call_method(&session, "end", &[]);
            Err(e)
        }
    }
}

async fn configure_session(
    session: &JsValue,
    init: &SessionInit,
    handles: &Rc<RefCell<XrHandles>>,
    inbox: &XrInbox,
    generation: u32,
) -> Result<SessionCapabilities, JsValue> {
    let cancelled = || JsValue::from_str("view closed before the session started");
    if !is_current(handles, generation) {
        return Err(cancelled());
    }

    install_base_layer(session)?;

    let local_space = await_promise(call_method(
        session,
        "requestReferenceSpace",
        &[&JsValue::from_str(&init.reference_space)],
    )?)
    .await?;
    let viewer_space = await_promise(call_method(
        session,
        "requestReferenceSpace",
        &[&JsValue::from_str("viewer")],
    )?)
    .await?;

    let hit_options = Object::new();
    set(&hit_options, "space", &viewer_space)?;
    let hit_test_source = match call_method(session, "requestHitTestSource", &[&hit_options]) {
        Ok(promise) => match await_promise(promise).await {
            Ok(source) => Some(source),
            Err(e) => {
                error!("Hit test source request failed: {}", describe(&e));
                None
            }
        },
        Err(e) => {
            error!("Hit test source request failed: {}", describe(&e));
            None
        }
    };

    if !is_current(handles, generation) {
        return Err(cancelled());
    }

    let caps = granted_capabilities(session, init);
    add_session_listeners(session, Rc::downgrade(handles), inbox.clone(), generation)?;

    {
        let mut h = handles.borrow_mut();
        h.session = Some(session.clone());
        h.local_space = Some(local_space);
        h.hit_test_source = hit_test_source;
        h.anchor = None;
        h.pending_anchor = None;
    }
    start_frame_loop(session, handles, inbox.clone(), generation)?;
    Ok(caps)
}

fn add_session_listeners(
    session: &JsValue,
    handles: Weak<RefCell<XrHandles>>,
    inbox: XrInbox,
    generation: u32,
) -> Result<(), JsValue> {
    let select_inbox = inbox.clone();
    let select_handles = handles.clone();
    let on_select = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
        if let Some(handles) = select_handles.upgrade() {
            if is_current(&handles, generation) {
                select_inbox.push_select();
            }
        }
    });
    call_method(
        session,
        "addEventListener",
        &[&JsValue::from_str("select"), on_select.as_ref()],
    )?;
    on_select.forget();

    let on_end = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
        // Ends we asked for have already bumped the generation
        if let Some(handles) = handles.upgrade() {
            if is_current(&handles, generation) {
                handles.borrow_mut().session = None;
                inbox.push_event(SessionEvent::Ended);
            }
        }
    });
    call_method(
        session,
        "addEventListener",
        &[&JsValue::from_str("end"), on_end.as_ref()],
    )?;
    on_end.forget();
    Ok(())
}

fn start_frame_loop(
    session: &JsValue,
    handles: &Rc<RefCell<XrHandles>>,
    inbox: XrInbox,
    generation: u32,
) -> Result<(), JsValue> {
    let slot: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
    let weak_slot = Rc::downgrade(&slot);
    let weak_handles = Rc::downgrade(handles);
    let mut sequence = 0u64;

    let callback = Closure::<dyn FnMut(f64, JsValue)>::new(move |_time: f64, frame: JsValue| {
        let (Some(handles), Some(slot)) = (weak_handles.upgrade(), weak_slot.upgrade()) else {
            return;
        };
        if !is_current(&handles, generation) {
            return;
        }

        sequence += 1;
        let sample = sample_frame(&frame, &handles.borrow(), sequence);
        inbox.store_frame(sample);
        create_pending_anchor(&frame, &handles, &inbox, generation);

        let Ok(session) = get(&frame, "session") else {
            return;
        };
        if let Some(callback) = slot.borrow().as_ref() {
            if let Err(e) = call_method(&session, "requestAnimationFrame", &[callback.as_ref()]) {
                error!("XR requestAnimationFrame failed: {}", describe(&e));
            }
        };
    });

    call_method(session, "requestAnimationFrame", &[callback.as_ref()])?;
    *slot.borrow_mut() = Some(callback);
    // Replacing an older loop drops its closure; that session has ended
    handles.borrow_mut().frame_loop = Some(slot);
    Ok(())
}

fn sample_frame(frame: &JsValue, handles: &XrHandles, sequence: u64) -> XrFrameSample {
    let mut sample = XrFrameSample {
        sequence,
        ..default()
    };
    let Some(space) = handles.local_space.as_ref() else {
        return sample;
    };

    if let Ok(viewer_pose) = call_method(frame, "getViewerPose", &[space]) {
        sample.viewer = matrix_pose(&viewer_pose);
        sample.projection = view_projection(&viewer_pose);
    }

    if let Some(source) = handles.hit_test_source.as_ref() {
        sample.hit = call_method(frame, "getHitTestResults", &[source])
            .ok()
            .filter(Array::is_array)
            .map(|results| Array::from(&results).get(0))
            .filter(is_present)
            .and_then(|hit| call_method(&hit, "getPose", &[space]).ok())
            .and_then(|pose| matrix_pose(&pose));
    }

    if let Some(anchor) = handles.anchor.as_ref() {
        sample.anchor = get(anchor, "anchorSpace")
            .ok()
            .and_then(|anchor_space| call_method(frame, "getPose", &[&anchor_space, space]).ok())
            .and_then(|pose| matrix_pose(&pose));
    }

    sample
}

/// Anchors can only be created from an `XRFrame`, so requests made by the
/// placement systems are issued from inside the frame callback
fn create_pending_anchor(
    frame: &JsValue,
    handles: &Rc<RefCell<XrHandles>>,
    inbox: &XrInbox,
    generation: u32,
) {
    let (pose, space, id) = {
        let mut h = handles.borrow_mut();
        let Some(pose) = h.pending_anchor.take() else {
            return;
        };
        let Some(space) = h.local_space.clone() else {
            return;
        };
        h.next_anchor_id += 1;
        (pose, space, AnchorId(h.next_anchor_id))
    };

    let point = Object::new();
    let request = set(&point, "x", &JsValue::from_f64(pose.position.x as f64))
        .and_then(|_| set(&point, "y", &JsValue::from_f64(pose.position.y as f64)))
        .and_then(|_| set(&point, "z", &JsValue::from_f64(pose.position.z as f64)))
        .and_then(|_| construct("XRRigidTransform", &[&point]))
        .and_then(|transform| call_method(frame, "createAnchor", &[&transform, &space]));

    let promise = match request {
        Ok(promise) => promise,
        Err(e) => {
            inbox.push_anchor_result(Err(describe(&e)));
            return;
        }
    };

    let handles = Rc::downgrade(handles);
    let inbox = inbox.clone();
    spawn_local(async move {
        let result = await_promise(promise).await;
        let Some(handles) = handles.upgrade() else {
            return;
        };
        if !is_current(&handles, generation) {
            if let Ok(anchor) = result {
                let _ = call_method(&anchor, "delete", &[]);
            }
            return;
        }
        match result {
            Ok(anchor) => {
                handles.borrow_mut().anchor = Some(anchor);
                inbox.push_anchor_result(Ok(id));
            }
            Err(e) => inbox.push_anchor_result(Err(describe(&e))),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox_drains() {
        let inbox = XrInbox::default();
        inbox.push_event(SessionEvent::SupportChecked(true));
        inbox.push_select();
        inbox.push_select();

        assert_eq!(inbox.take_events(), vec![SessionEvent::SupportChecked(true)]);
        assert!(inbox.take_events().is_empty());
        assert_eq!(inbox.take_selects(), 2);
        assert_eq!(inbox.take_selects(), 0);
    }

    #[test]
    fn test_clear_resets_frame() {
        let inbox = XrInbox::default();
        inbox.store_frame(XrFrameSample {
            sequence: 7,
            hit: Some(RigidPose::IDENTITY),
            ..default()
        });
        inbox.push_anchor_result(Ok(AnchorId(1)));
        inbox.clear();

        assert_eq!(inbox.latest_frame(), Some(XrFrameSample::default()));
        assert!(inbox.take_anchor_results().is_empty());
    }
}
