//! The world object. All window-manager state hangs off [`Wm`]: the arenas
//! for monitors, clients and seats, the device registry, and the handful of
//! global flags (pinned monitor, spawn context, in-flight arrangement).

use {
    crate::{
        arena::Arena,
        backend::{DeviceId, DisplayServer, WindowHandle},
        client::{Client, ClientId},
        config::Config,
        errorfmt::ErrorFmt,
        monitor::{Monitor, MonitorId},
        seat::{Device, Seat, SeatId},
    },
    ahash::AHashMap,
};

pub struct Wm {
    pub display: Box<dyn DisplayServer>,
    pub config: Config,

    pub monitors: Arena<MonitorId, Monitor>,
    pub clients: Arena<ClientId, Client>,
    pub seats: Arena<SeatId, Seat>,
    pub devices: AHashMap<DeviceId, Device>,

    /// Monitors in left-to-right protocol order. The first entry doubles as
    /// the fallback monitor for orphaned clients.
    pub mon_order: Vec<MonitorId>,

    /// Seat and monitor that initiated the most recent spawn. `manage` uses
    /// them to place windows without a transient parent.
    pub spawn_seat: Option<SeatId>,
    pub spawn_monitor: Option<MonitorId>,

    /// Forced-focus monitor. While set, a seat leaving this monitor swaps
    /// monitor contents instead of moving its selection.
    pub pinned: Option<MonitorId>,
    /// A pinned-monitor swap is in progress; monitor selection and enter
    /// events are ignored until its event backlog is replayed.
    pub forcing_focus: bool,

    pub screen_w: i32,
    pub screen_h: i32,
    pub bar_height: i32,

    pub running: bool,
}

impl Wm {
    pub fn new(display: Box<dyn DisplayServer>, config: Config) -> Self {
        let (screen_w, screen_h) = display.screen_size();
        let bar_height = config.bar_px + config.bar_gap_px;
        let mut wm = Self {
            display,
            config,
            monitors: Default::default(),
            clients: Default::default(),
            seats: Default::default(),
            devices: Default::default(),
            mon_order: Vec::new(),
            spawn_seat: None,
            spawn_monitor: None,
            pinned: None,
            forcing_focus: false,
            screen_w,
            screen_h,
            bar_height,
            running: false,
        };
        wm.update_geometry(None);
        wm.init_devices();
        wm
    }

    /// Manage the windows that already exist. Non-transient windows first so
    /// transients can resolve their parents.
    pub fn scan(&mut self) {
        let windows = self.display.existing_windows();
        for &w in &windows {
            let attrs = match self.display.window_attrs(w) {
                Ok(attrs) => attrs,
                Err(e) => {
                    log::debug!("skipping window {}: {}", w, ErrorFmt(e));
                    continue;
                }
            };
            if attrs.override_redirect || self.display.transient_for(w).is_some() {
                continue;
            }
            if attrs.viewable {
                self.manage(w, attrs);
            }
        }
        for &w in &windows {
            let Ok(attrs) = self.display.window_attrs(w) else {
                continue;
            };
            if attrs.override_redirect || self.display.transient_for(w).is_none() {
                continue;
            }
            if attrs.viewable && self.client_by_window(w).is_none() {
                self.manage(w, attrs);
            }
        }
    }

    pub fn run(&mut self) {
        self.running = true;
        self.display.sync();
        while self.running {
            let Some(event) = self.display.next_event() else {
                break;
            };
            self.dispatch(event);
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Graceful teardown: show everything, release every client back to the
    /// display server, drop advertised state.
    pub fn shutdown(&mut self) {
        let all = self.config.tag_mask();
        for seat in self.seats.ids() {
            self.view(seat, all);
        }
        for client in self.clients.ids() {
            self.unmanage(client, false);
        }
        self.display.advertise_active_window(None);
        self.display.advertise_client_list(&[]);
        self.display.sync();
    }

    /// The external renderer hands the core a bar window per monitor.
    pub fn attach_bar(&mut self, monitor: MonitorId, bar: WindowHandle) {
        let bar_height = self.bar_height;
        let Some(m) = self.monitors.get_mut(monitor) else {
            return;
        };
        m.bar_win = Some(bar);
        let (x, y, w) = (m.area.x(), m.bar_y, m.area.width());
        self.display.move_resize_bar(bar, x, y, w, bar_height);
    }

    /// Record which seat (and optionally which monitor) initiated a spawn.
    pub fn note_spawn(&mut self, seat: SeatId, monitor: Option<MonitorId>) {
        self.spawn_seat = Some(seat);
        self.spawn_monitor = monitor;
    }

    // Lookups.

    pub fn client_by_window(&self, w: WindowHandle) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, c)| c.window == w)
            .map(|(id, _)| id)
    }

    pub fn first_monitor(&self) -> Option<MonitorId> {
        self.mon_order.first().copied()
    }

    pub fn first_seat(&self) -> Option<SeatId> {
        self.seats.iter().next().map(|(id, _)| id)
    }

    /// The monitor holding the biggest share of the rectangle. Falls back to
    /// the seat's selected monitor.
    pub fn rect_to_mon(
        &self,
        seat: SeatId,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    ) -> Option<MonitorId> {
        let rect = crate::rect::Rect::new(x, y, w, h);
        let mut best = self.seats.get(seat).and_then(|s| s.sel_monitor);
        let mut area = 0;
        for &id in &self.mon_order {
            let Some(m) = self.monitors.get(id) else {
                continue;
            };
            let a = rect.intersection_area(m.catchment(self.bar_height));
            if a > area {
                area = a;
                best = Some(id);
            }
        }
        best
    }

    /// Directional monitor switch: positive is left, negative is right.
    /// Picks the nearest monitor on that side, wrapping to the farthest
    /// monitor on the other side.
    pub fn dir_to_mon(&self, seat: SeatId, dir: i32) -> Option<MonitorId> {
        let sel = self.seats.get(seat)?.sel_monitor?;
        let middle = self.monitors.get(sel)?.dim.center_x();
        let mut nearest: Option<(i32, MonitorId)> = None;
        let mut farthest: Option<(i32, MonitorId)> = None;
        for &id in &self.mon_order {
            if id == sel {
                continue;
            }
            let Some(m) = self.monitors.get(id) else {
                continue;
            };
            // Positive delta: monitor is to the left of the selection.
            let delta = middle - m.dim.center_x();
            let (on_side, dist) = if dir > 0 {
                (delta > 0, delta)
            } else {
                (delta < 0, -delta)
            };
            if on_side {
                if nearest.map_or(true, |(d, _)| dist < d) {
                    nearest = Some((dist, id));
                }
            } else if farthest.map_or(true, |(d, _)| -dist > d) {
                farthest = Some((-dist, id));
            }
        }
        nearest.or(farthest).map(|(_, m)| m)
    }

    /// Monitor owning a window: bar windows and client windows resolve to
    /// their monitor, the root resolves by pointer position, anything else to
    /// the seat's selection.
    pub fn win_to_mon(&self, seat: SeatId, w: Option<WindowHandle>) -> Option<MonitorId> {
        if let Some(w) = w {
            if let Some(m) = self.any_win_to_mon(w) {
                return Some(m);
            }
        } else if let Some(ptr) = self.seats.get(seat).and_then(|s| s.pointer) {
            if let Some((x, y)) = self.display.pointer_position(ptr) {
                return self.rect_to_mon(seat, x, y, 1, 1);
            }
        }
        self.seats.get(seat).and_then(|s| s.sel_monitor)
    }

    pub fn any_win_to_mon(&self, w: WindowHandle) -> Option<MonitorId> {
        for &id in &self.mon_order {
            if self.monitors.get(id).is_some_and(|m| m.bar_win == Some(w)) {
                return Some(id);
            }
        }
        self.client_by_window(w)
            .and_then(|c| self.clients.get(c))
            .map(|c| c.monitor)
    }

    pub fn advertise_clients(&mut self) {
        let mut windows = Vec::with_capacity(self.clients.len());
        for &m in &self.mon_order {
            let Some(m) = self.monitors.get(m) else {
                continue;
            };
            for &c in &m.clients {
                if let Some(c) = self.clients.get(c) {
                    windows.push(c.window);
                }
            }
        }
        self.display.advertise_client_list(&windows);
    }
}
