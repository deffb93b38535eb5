//! Shared test harness: a recording in-memory display server and a builder
//! for worlds with a given number of screens and seats.

use {
    crate::{
        backend::{
            BorderScheme, CursorKind, DeviceId, DeviceInfo, DeviceRole, DisplayError,
            DisplayServer, HierarchyChange, SizeHints, StackLayer, WindowAttrs, WindowHandle,
            WindowState, WmHints, SLAVE_ADDED,
        },
        client::ClientId,
        config::Config,
        event::Event,
        monitor::MonitorId,
        rect::Rect,
        seat::SeatId,
        state::Wm,
    },
    ahash::{AHashMap, AHashSet},
    std::{cell::RefCell, collections::VecDeque, rc::Rc},
};

#[derive(Clone)]
struct FakeWindow {
    attrs: WindowAttrs,
    title: String,
    class: String,
    instance: String,
    hints: SizeHints,
    wm_hints: WmHints,
    state: WindowState,
    transient: Option<WindowHandle>,
}

impl Default for FakeWindow {
    fn default() -> Self {
        FakeWindow {
            attrs: WindowAttrs {
                geometry: Rect::new(100, 100, 400, 300),
                border_width: 1,
                override_redirect: false,
                viewable: true,
            },
            title: "win".to_string(),
            class: String::new(),
            instance: String::new(),
            hints: SizeHints::default(),
            wm_hints: WmHints::default(),
            state: WindowState::default(),
            transient: None,
        }
    }
}

#[derive(Default)]
struct Recording {
    screens: Vec<Rect>,
    devices: Vec<DeviceInfo>,
    pointer_pos: AHashMap<DeviceId, (i32, i32)>,
    windows: AHashMap<u64, FakeWindow>,
    moved: AHashMap<u64, (i32, i32)>,
    border_schemes: AHashMap<u64, (BorderScheme, bool)>,
    refuse_close: AHashSet<u64>,
    killed: AHashSet<u64>,
    events: VecDeque<Event>,
    /// Number of requests (mutating calls) issued so far.
    calls: usize,
}

impl Recording {
    fn screen_size(&self) -> (i32, i32) {
        let w = self.screens.iter().map(|r| r.right()).max().unwrap_or(0);
        let h = self.screens.iter().map(|r| r.bottom()).max().unwrap_or(0);
        (w, h)
    }
}

struct FakeDisplay {
    rec: Rc<RefCell<Recording>>,
}

impl DisplayServer for FakeDisplay {
    fn screen_size(&self) -> (i32, i32) {
        self.rec.borrow().screen_size()
    }

    fn screens(&self) -> Vec<Rect> {
        self.rec.borrow().screens.clone()
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.rec.borrow().devices.clone()
    }

    fn pointer_position(&self, pointer: DeviceId) -> Option<(i32, i32)> {
        Some(
            self.rec
                .borrow()
                .pointer_pos
                .get(&pointer)
                .copied()
                .unwrap_or((0, 0)),
        )
    }

    fn window_attrs(&self, window: WindowHandle) -> Result<WindowAttrs, DisplayError> {
        self.rec
            .borrow()
            .windows
            .get(&window.0)
            .map(|w| w.attrs)
            .ok_or(DisplayError::WindowGone(window))
    }

    fn window_exists(&self, window: WindowHandle) -> bool {
        self.rec.borrow().windows.contains_key(&window.0)
    }

    fn existing_windows(&self) -> Vec<WindowHandle> {
        let mut ids: Vec<u64> = self.rec.borrow().windows.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(WindowHandle).collect()
    }

    fn transient_for(&self, window: WindowHandle) -> Option<WindowHandle> {
        self.rec.borrow().windows.get(&window.0)?.transient
    }

    fn title(&self, window: WindowHandle) -> String {
        self.rec
            .borrow()
            .windows
            .get(&window.0)
            .map(|w| w.title.clone())
            .unwrap_or_default()
    }

    fn class_instance(&self, window: WindowHandle) -> (String, String) {
        self.rec
            .borrow()
            .windows
            .get(&window.0)
            .map(|w| (w.class.clone(), w.instance.clone()))
            .unwrap_or_default()
    }

    fn size_hints(&self, window: WindowHandle) -> SizeHints {
        self.rec
            .borrow()
            .windows
            .get(&window.0)
            .map(|w| w.hints)
            .unwrap_or_default()
    }

    fn wm_hints(&self, window: WindowHandle) -> WmHints {
        self.rec
            .borrow()
            .windows
            .get(&window.0)
            .map(|w| w.wm_hints)
            .unwrap_or_default()
    }

    fn window_state(&self, window: WindowHandle) -> WindowState {
        self.rec
            .borrow()
            .windows
            .get(&window.0)
            .map(|w| w.state)
            .unwrap_or_default()
    }

    fn configure(&mut self, window: WindowHandle, geometry: Rect, _border_width: i32) {
        let mut rec = self.rec.borrow_mut();
        rec.calls += 1;
        rec.moved.insert(window.0, (geometry.x(), geometry.y()));
    }

    fn notify_config(&mut self, _window: WindowHandle, _geometry: Rect, _border_width: i32) {
        self.rec.borrow_mut().calls += 1;
    }

    fn configure_unmanaged(
        &mut self,
        _window: WindowHandle,
        _geometry: Rect,
        _border_width: Option<i32>,
    ) {
        self.rec.borrow_mut().calls += 1;
    }

    fn set_border_width(&mut self, _window: WindowHandle, _width: i32) {
        self.rec.borrow_mut().calls += 1;
    }

    fn set_border_scheme(&mut self, window: WindowHandle, scheme: BorderScheme, pinned: bool) {
        let mut rec = self.rec.borrow_mut();
        rec.calls += 1;
        rec.border_schemes.insert(window.0, (scheme, pinned));
    }

    fn move_window(&mut self, window: WindowHandle, x: i32, y: i32) {
        let mut rec = self.rec.borrow_mut();
        rec.calls += 1;
        rec.moved.insert(window.0, (x, y));
    }

    fn map_window(&mut self, _window: WindowHandle) {
        self.rec.borrow_mut().calls += 1;
    }

    fn restack(&mut self, _window: WindowHandle, _layer: StackLayer) {
        self.rec.borrow_mut().calls += 1;
    }

    fn select_client_events(&mut self, _window: WindowHandle) {
        self.rec.borrow_mut().calls += 1;
    }

    fn clear_events(&mut self, _window: WindowHandle) {
        self.rec.borrow_mut().calls += 1;
    }

    fn set_withdrawn(&mut self, _window: WindowHandle, _withdrawn: bool) {
        self.rec.borrow_mut().calls += 1;
    }

    fn set_fullscreen_state(&mut self, _window: WindowHandle, _fullscreen: bool) {
        self.rec.borrow_mut().calls += 1;
    }

    fn set_urgency(&mut self, _window: WindowHandle, _urgent: bool) {
        self.rec.borrow_mut().calls += 1;
    }

    fn set_keyboard_focus(&mut self, _keyboard: DeviceId, _window: Option<WindowHandle>) {
        self.rec.borrow_mut().calls += 1;
    }

    fn set_client_pointer(&mut self, _window: Option<WindowHandle>, _pointer: DeviceId) {
        self.rec.borrow_mut().calls += 1;
    }

    fn send_take_focus(&mut self, _window: WindowHandle) {
        self.rec.borrow_mut().calls += 1;
    }

    fn request_close(&mut self, window: WindowHandle) -> bool {
        let mut rec = self.rec.borrow_mut();
        rec.calls += 1;
        !rec.refuse_close.contains(&window.0)
    }

    fn kill_window(&mut self, window: WindowHandle) {
        let mut rec = self.rec.borrow_mut();
        rec.calls += 1;
        rec.killed.insert(window.0);
    }

    fn grab_client_buttons(
        &mut self,
        _pointer: DeviceId,
        _window: WindowHandle,
        _focused: bool,
        _grabbed: bool,
    ) {
        self.rec.borrow_mut().calls += 1;
    }

    fn grab_seat_keys(&mut self, _keyboard: DeviceId) {
        self.rec.borrow_mut().calls += 1;
    }

    fn grab_pointer(&mut self, _pointer: DeviceId, _cursor: CursorKind) -> bool {
        self.rec.borrow_mut().calls += 1;
        true
    }

    fn ungrab_pointer(&mut self, _pointer: DeviceId) {
        self.rec.borrow_mut().calls += 1;
    }

    fn warp_pointer(&mut self, pointer: DeviceId, dx: i32, dy: i32) {
        let mut rec = self.rec.borrow_mut();
        rec.calls += 1;
        let (x, y) = rec.pointer_pos.get(&pointer).copied().unwrap_or((0, 0));
        rec.pointer_pos.insert(pointer, (x + dx, y + dy));
    }

    fn advertise_active_window(&mut self, _window: Option<WindowHandle>) {
        self.rec.borrow_mut().calls += 1;
    }

    fn advertise_client_list(&mut self, _windows: &[WindowHandle]) {
        self.rec.borrow_mut().calls += 1;
    }

    fn move_resize_bar(&mut self, _bar: WindowHandle, _x: i32, _y: i32, _w: i32, _h: i32) {
        self.rec.borrow_mut().calls += 1;
    }

    fn bar_dirty(&mut self, _monitor: i32) {
        self.rec.borrow_mut().calls += 1;
    }

    fn next_event(&mut self) -> Option<Event> {
        self.rec.borrow_mut().events.pop_front()
    }

    fn drain_events(&mut self) -> Vec<Event> {
        self.rec.borrow_mut().events.drain(..).collect()
    }

    fn sync(&mut self) {}
}

/// Handle for poking and inspecting the fake display from tests.
pub struct TestRecorder(Rc<RefCell<Recording>>);

impl TestRecorder {
    pub fn set_size_hints(&self, window: u64, hints: SizeHints) {
        self.0
            .borrow_mut()
            .windows
            .entry(window)
            .or_default()
            .hints = hints;
    }

    pub fn set_pointer(&self, device: DeviceId, x: i32, y: i32) {
        self.0.borrow_mut().pointer_pos.insert(device, (x, y));
    }

    pub fn refuse_close(&self, window: u64) {
        self.0.borrow_mut().refuse_close.insert(window);
    }

    pub fn killed(&self, window: u64) -> bool {
        self.0.borrow().killed.contains(&window)
    }

    pub fn border_scheme(&self, window: u64) -> Option<BorderScheme> {
        self.0.borrow().border_schemes.get(&window).map(|&(s, _)| s)
    }

    pub fn moved_off_screen(&self, window: WindowHandle) -> bool {
        self.0
            .borrow()
            .moved
            .get(&window.0)
            .is_some_and(|&(x, _)| x < 0)
    }

    pub fn call_count(&self) -> usize {
        self.0.borrow().calls
    }

    pub fn reset_calls(&self) {
        self.0.borrow_mut().calls = 0;
    }
}

pub struct TestWm {
    pub wm: Wm,
    rec: Rc<RefCell<Recording>>,
}

impl TestWm {
    /// `count` side-by-side 1000x800 screens and a single seat.
    pub fn with_monitors(count: usize) -> Self {
        Self::build(count, 1)
    }

    /// One screen and `count` seats (master pointer/keyboard pairs).
    pub fn with_seats(count: usize) -> Self {
        Self::build(1, count)
    }

    fn build(screens: usize, seats: usize) -> Self {
        let rec = Rc::new(RefCell::new(Recording::default()));
        {
            let mut r = rec.borrow_mut();
            for i in 0..screens {
                r.screens.push(Rect::new(i as i32 * 1000, 0, 1000, 800));
            }
            for i in 0..seats as u32 {
                let ptr = DeviceId(10 * i + 1);
                let kbd = DeviceId(10 * i + 2);
                r.devices.push(DeviceInfo {
                    id: ptr,
                    role: DeviceRole::MasterPointer,
                    attachment: kbd,
                });
                r.devices.push(DeviceInfo {
                    id: kbd,
                    role: DeviceRole::MasterKeyboard,
                    attachment: ptr,
                });
            }
        }
        let wm = Wm::new(Box::new(FakeDisplay { rec: rec.clone() }), Config::default());
        TestWm { wm, rec }
    }

    pub fn rec(&self) -> TestRecorder {
        TestRecorder(self.rec.clone())
    }

    pub fn seat(&self, index: usize) -> SeatId {
        self.wm.seats.ids()[index]
    }

    pub fn monitor(&self, index: usize) -> MonitorId {
        self.wm.mon_order[index]
    }

    fn manage_window(&mut self, window: u64, fake: FakeWindow) -> ClientId {
        let attrs = fake.attrs;
        self.rec.borrow_mut().windows.insert(window, fake);
        let seat = self.seat(0);
        self.wm.note_spawn(seat, None);
        self.wm.manage(WindowHandle(window), attrs);
        self.wm
            .client_by_window(WindowHandle(window))
            .expect("window was not managed")
    }

    /// Map and manage a plain (tiled) window.
    pub fn add_window(&mut self, window: u64) -> ClientId {
        self.manage_window(window, FakeWindow::default())
    }

    /// Map a window that asks for an explicit size, which floats it.
    pub fn add_floating_window(&mut self, window: u64, geometry: Rect) -> ClientId {
        let mut fake = FakeWindow::default();
        fake.attrs.geometry = geometry;
        fake.hints.explicit_size = true;
        self.manage_window(window, fake)
    }

    /// Map a window whose min and max sizes coincide.
    pub fn add_fixed_window(&mut self, window: u64, w: i32, h: i32) -> ClientId {
        let mut fake = FakeWindow::default();
        fake.attrs.geometry = Rect::new(50, 50, w, h);
        fake.hints.min_w = w;
        fake.hints.max_w = w;
        fake.hints.min_h = h;
        fake.hints.max_h = h;
        self.manage_window(window, fake)
    }

    pub fn add_window_with_class(
        &mut self,
        window: u64,
        instance: &str,
        class: &str,
    ) -> ClientId {
        let mut fake = FakeWindow::default();
        fake.instance = instance.to_string();
        fake.class = class.to_string();
        self.manage_window(window, fake)
    }

    /// Hotplug a slave pointer onto a seat's master.
    pub fn add_slave_pointer(&mut self, seat_index: usize) -> DeviceId {
        let seat = self.seat(seat_index);
        let master = self.wm.seats.get(seat).and_then(|s| s.pointer).unwrap();
        let id = DeviceId(100 + self.rec.borrow().devices.len() as u32);
        let info = DeviceInfo {
            id,
            role: DeviceRole::SlavePointer,
            attachment: master,
        };
        self.rec.borrow_mut().devices.push(info);
        self.wm.hierarchy_changed(&[HierarchyChange {
            info,
            flags: SLAVE_ADDED,
        }]);
        id
    }

    /// Drop all but the first screen; the caller re-runs geometry detection.
    pub fn shrink_to_one_screen(&mut self) {
        self.rec.borrow_mut().screens.truncate(1);
    }
}
