//! The display-server seam. The core never talks to a protocol socket
//! directly; everything it needs from the display lives behind
//! [`DisplayServer`], which the embedding binary implements for its transport
//! and tests implement with a recording fake.

use {
    crate::{event::Event, rect::Rect},
    std::fmt::{self, Display, Formatter},
    thiserror::Error,
};

/// Opaque protocol window handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct WindowHandle(pub u64);

impl Display for WindowHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Protocol input-device id. Stable for the lifetime of the device.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DeviceRole {
    MasterPointer,
    MasterKeyboard,
    SlavePointer,
    SlaveKeyboard,
}

impl DeviceRole {
    pub fn is_master(self) -> bool {
        matches!(self, DeviceRole::MasterPointer | DeviceRole::MasterKeyboard)
    }

    pub fn is_pointer(self) -> bool {
        matches!(self, DeviceRole::MasterPointer | DeviceRole::SlavePointer)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub role: DeviceRole,
    /// The paired master for a master device, the owning master for a slave.
    pub attachment: DeviceId,
}

/// One entry of a device-hierarchy change notification. A single notification
/// carries a batch of these.
#[derive(Copy, Clone, Debug)]
pub struct HierarchyChange {
    pub info: DeviceInfo,
    pub flags: HierarchyFlags,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct HierarchyFlags(pub u32);

pub const MASTER_ADDED: HierarchyFlags = HierarchyFlags(1 << 0);
pub const MASTER_REMOVED: HierarchyFlags = HierarchyFlags(1 << 1);
pub const SLAVE_ADDED: HierarchyFlags = HierarchyFlags(1 << 2);
pub const SLAVE_REMOVED: HierarchyFlags = HierarchyFlags(1 << 3);
pub const SLAVE_ATTACHED: HierarchyFlags = HierarchyFlags(1 << 4);
pub const SLAVE_DETACHED: HierarchyFlags = HierarchyFlags(1 << 5);

impl HierarchyFlags {
    pub fn contains(self, other: HierarchyFlags) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for HierarchyFlags {
    type Output = HierarchyFlags;

    fn bitor(self, rhs: HierarchyFlags) -> HierarchyFlags {
        HierarchyFlags(self.0 | rhs.0)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct WindowAttrs {
    pub geometry: Rect,
    pub border_width: i32,
    pub override_redirect: bool,
    pub viewable: bool,
}

/// Normalized size hints. Aspect ratios follow the protocol convention:
/// `min_aspect` is stored as min-height / min-width, `max_aspect` as
/// max-width / max-height, so both compare against `w / h` with a single
/// multiplication.
#[derive(Copy, Clone, Default, Debug)]
pub struct SizeHints {
    pub base_w: i32,
    pub base_h: i32,
    pub inc_w: i32,
    pub inc_h: i32,
    pub min_w: i32,
    pub min_h: i32,
    pub max_w: i32,
    pub max_h: i32,
    pub min_aspect: f64,
    pub max_aspect: f64,
    /// The client specified an explicit size (not just a program default).
    pub explicit_size: bool,
    /// Requested placement gravity. `None` covers the default north-west
    /// gravity, which carries no placement information.
    pub gravity: Option<Gravity>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Gravity {
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl SizeHints {
    pub fn is_fixed(&self) -> bool {
        self.max_w != 0 && self.max_h != 0 && self.max_w == self.min_w && self.max_h == self.min_h
    }
}

#[derive(Copy, Clone, Default, Debug)]
pub struct WmHints {
    pub urgent: bool,
    /// `None` when the client did not set the input hint.
    pub input: Option<bool>,
}

/// Window state bits the core reacts to.
#[derive(Copy, Clone, Default, Debug)]
pub struct WindowState {
    pub fullscreen: bool,
    pub dialog: bool,
}

/// Stacking layer for floating-window restacks.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StackLayer {
    /// Directly below the focused-floating reference, above other clients.
    FloatingFocused,
    /// Below the floating reference, above tiled clients.
    Floating,
    /// Below the tiled reference, under all floating clients and bars.
    Tiled,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CursorKind {
    Normal,
    Move,
    Resize,
}

/// Border color tier. Higher tiers mark windows focused by more seats.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub enum BorderScheme {
    Normal,
    Sel,
    Sel2,
    Sel3,
}

impl BorderScheme {
    pub fn from_seat_count(n: usize) -> Self {
        match n {
            0 => BorderScheme::Normal,
            1 => BorderScheme::Sel,
            2 => BorderScheme::Sel2,
            _ => BorderScheme::Sel3,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Property {
    Title,
    SizeHints,
    WmHints,
    TransientFor,
    WindowType,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum FullscreenAction {
    Add,
    Remove,
    Toggle,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ClientMessage {
    SetFullscreen(FullscreenAction),
    Activate,
}

#[derive(Debug, Error)]
pub enum DisplayError {
    /// The window disappeared between the event and our request. Routinely
    /// tolerated; clients may destroy windows at any time.
    #[error("window {0} is gone")]
    WindowGone(WindowHandle),
    #[error("display connection error: {0}")]
    Connection(String),
}

/// Everything the core asks of the display server.
///
/// Query methods that can race with client-side destruction return `Result`;
/// the core tolerates [`DisplayError::WindowGone`] wherever the original
/// protocol allows the race. One-way requests are infallible at this seam;
/// the transport reports hard connection failures through its event stream.
pub trait DisplayServer {
    // Queries.
    fn screen_size(&self) -> (i32, i32);
    /// Physical screen rectangles in protocol order.
    fn screens(&self) -> Vec<Rect>;
    fn devices(&self) -> Vec<DeviceInfo>;
    fn pointer_position(&self, pointer: DeviceId) -> Option<(i32, i32)>;
    fn window_attrs(&self, window: WindowHandle) -> Result<WindowAttrs, DisplayError>;
    fn window_exists(&self, window: WindowHandle) -> bool;
    /// Top-level windows present at startup, in stacking order.
    fn existing_windows(&self) -> Vec<WindowHandle>;
    fn transient_for(&self, window: WindowHandle) -> Option<WindowHandle>;
    fn title(&self, window: WindowHandle) -> String;
    fn class_instance(&self, window: WindowHandle) -> (String, String);
    fn size_hints(&self, window: WindowHandle) -> SizeHints;
    fn wm_hints(&self, window: WindowHandle) -> WmHints;
    fn window_state(&self, window: WindowHandle) -> WindowState;

    // Window requests.
    fn configure(&mut self, window: WindowHandle, geometry: Rect, border_width: i32);
    /// Synthetic configure telling the client its final geometry.
    fn notify_config(&mut self, window: WindowHandle, geometry: Rect, border_width: i32);
    /// Pass-through configure for windows we do not manage.
    fn configure_unmanaged(
        &mut self,
        window: WindowHandle,
        geometry: Rect,
        border_width: Option<i32>,
    );
    fn set_border_width(&mut self, window: WindowHandle, width: i32);
    fn set_border_scheme(&mut self, window: WindowHandle, scheme: BorderScheme, pinned: bool);
    fn move_window(&mut self, window: WindowHandle, x: i32, y: i32);
    fn map_window(&mut self, window: WindowHandle);
    fn restack(&mut self, window: WindowHandle, layer: StackLayer);
    fn select_client_events(&mut self, window: WindowHandle);
    fn clear_events(&mut self, window: WindowHandle);
    fn set_withdrawn(&mut self, window: WindowHandle, withdrawn: bool);
    fn set_fullscreen_state(&mut self, window: WindowHandle, fullscreen: bool);
    fn set_urgency(&mut self, window: WindowHandle, urgent: bool);

    // Focus and input.
    fn set_keyboard_focus(&mut self, keyboard: DeviceId, window: Option<WindowHandle>);
    /// Route a pointer's client-pointer setting so the right seat answers
    /// queries from the focused client.
    fn set_client_pointer(&mut self, window: Option<WindowHandle>, pointer: DeviceId);
    fn send_take_focus(&mut self, window: WindowHandle);
    /// Politely ask the window to close. False when the client does not
    /// support the protocol.
    fn request_close(&mut self, window: WindowHandle) -> bool;
    fn kill_window(&mut self, window: WindowHandle);
    fn grab_client_buttons(
        &mut self,
        pointer: DeviceId,
        window: WindowHandle,
        focused: bool,
        grabbed: bool,
    );
    fn grab_seat_keys(&mut self, keyboard: DeviceId);
    fn grab_pointer(&mut self, pointer: DeviceId, cursor: CursorKind) -> bool;
    fn ungrab_pointer(&mut self, pointer: DeviceId);
    fn warp_pointer(&mut self, pointer: DeviceId, dx: i32, dy: i32);

    // Root advertisements.
    fn advertise_active_window(&mut self, window: Option<WindowHandle>);
    fn advertise_client_list(&mut self, windows: &[WindowHandle]);

    // Bar plumbing. Rendering is external; the core only places the bar
    // window and signals redraws.
    fn move_resize_bar(&mut self, bar: WindowHandle, x: i32, y: i32, w: i32, h: i32);
    fn bar_dirty(&mut self, monitor: i32);

    // Event stream.
    fn next_event(&mut self) -> Option<Event>;
    /// Events already queued, without blocking. Used to replay events that
    /// arrive mid-arrangement.
    fn drain_events(&mut self) -> Vec<Event>;
    fn sync(&mut self);
}
