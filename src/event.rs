//! Event stream and dispatch. The transport decodes protocol events into
//! [`Event`] values; [`Wm::dispatch`] routes them. Key and button bindings
//! resolve to [`Command`]s on the transport side, so the core never sees raw
//! keycodes.

use {
    crate::{
        backend::{
            ClientMessage, DeviceId, FullscreenAction, HierarchyChange, Property, WindowHandle,
        },
        client::ClientId,
        command::Command,
        rect::Rect,
        seat::SeatId,
        state::Wm,
    },
    std::cmp::max,
};

/// Pointer-motion events are coalesced to roughly 250 per second.
const MOTION_INTERVAL_MS: u64 = 1000 / 250;

#[derive(Clone, Debug)]
pub enum Event {
    MapRequest {
        window: WindowHandle,
    },
    DestroyNotify {
        window: WindowHandle,
    },
    UnmapNotify {
        window: WindowHandle,
        /// Synthetic unmaps signal a client's withdrawal request.
        synthetic: bool,
    },
    ConfigureRequest {
        window: WindowHandle,
        geometry: Rect,
        border_width: Option<i32>,
        has_x: bool,
        has_y: bool,
        has_w: bool,
        has_h: bool,
    },
    /// The root window changed size (output hotplug or resolution change).
    RootResized {
        width: i32,
        height: i32,
    },
    PropertyChanged {
        /// `None` is the root window.
        window: Option<WindowHandle>,
        property: Property,
    },
    ClientMessage {
        window: WindowHandle,
        message: ClientMessage,
    },
    /// A key or button binding fired on a device.
    Command {
        device: DeviceId,
        time: u64,
        command: Command,
    },
    ButtonPress {
        device: DeviceId,
        /// `None` is the root window.
        window: Option<WindowHandle>,
        button: u32,
        time: u64,
    },
    ButtonRelease {
        device: DeviceId,
        button: u32,
        time: u64,
    },
    Motion {
        device: DeviceId,
        /// Window the event was delivered to. `None` is the root window.
        window: Option<WindowHandle>,
        /// Child window under the pointer, when any.
        child: Option<WindowHandle>,
        root_x: i32,
        root_y: i32,
        time: u64,
    },
    Enter {
        device: DeviceId,
        window: Option<WindowHandle>,
    },
    FocusIn {
        device: DeviceId,
        window: Option<WindowHandle>,
    },
    HierarchyChanged(Vec<HierarchyChange>),
}

impl Wm {
    pub fn dispatch(&mut self, event: Event) {
        match event {
            Event::MapRequest { window } => self.map_request(window),
            Event::DestroyNotify { window } => {
                if let Some(c) = self.client_by_window(window) {
                    self.unmanage(c, true);
                }
            }
            Event::UnmapNotify { window, synthetic } => self.unmap_notify(window, synthetic),
            Event::ConfigureRequest {
                window,
                geometry,
                border_width,
                has_x,
                has_y,
                has_w,
                has_h,
            } => self.configure_request(window, geometry, border_width, has_x, has_y, has_w, has_h),
            Event::RootResized { width, height } => self.root_resized(width, height),
            Event::PropertyChanged { window, property } => self.property_changed(window, property),
            Event::ClientMessage { window, message } => self.client_message(window, message),
            Event::Command {
                device,
                time,
                command,
            } => {
                if let Some(seat) = self.seat_of_device(device) {
                    if let Some(s) = self.seats.get_mut(seat) {
                        s.last_event_time = time;
                    }
                    self.run_command(seat, command);
                }
            }
            Event::ButtonPress {
                device,
                window,
                button,
                time,
            } => self.button_press(device, window, button, time),
            Event::ButtonRelease {
                device,
                button,
                time,
            } => self.button_release(device, button, time),
            Event::Motion {
                device,
                window,
                child,
                root_x,
                root_y,
                time,
            } => self.motion(device, window, child, root_x, root_y, time),
            Event::Enter { device, window } => self.enter(device, window),
            Event::FocusIn { device, window } => self.focus_in(device, window),
            Event::HierarchyChanged(changes) => self.hierarchy_changed(&changes),
        }
    }

    fn map_request(&mut self, window: WindowHandle) {
        let Ok(attrs) = self.display.window_attrs(window) else {
            return;
        };
        if attrs.override_redirect {
            return;
        }
        if self.client_by_window(window).is_none() {
            self.manage(window, attrs);
        }
    }

    fn unmap_notify(&mut self, window: WindowHandle, synthetic: bool) {
        let Some(c) = self.client_by_window(window) else {
            return;
        };
        if synthetic {
            self.display.set_withdrawn(window, true);
        } else {
            self.unmanage(c, false);
        }
    }

    fn root_resized(&mut self, width: i32, height: i32) {
        let dirty = self.screen_w != width || self.screen_h != height;
        self.screen_w = width;
        self.screen_h = height;
        log::debug!("root resized to {}x{}", width, height);
        if self.update_geometry(None) || dirty {
            for mon in self.mon_order.clone() {
                let Some(m) = self.monitors.get(mon) else {
                    continue;
                };
                let dim = m.dim;
                let clients = m.clients.clone();
                for c in clients {
                    if self.clients.get(c).is_some_and(|c| c.fullscreen) {
                        self.resize_client(c, dim);
                    }
                }
                self.move_bar(mon);
            }
            for seat in self.seats.ids() {
                self.focus(seat, None);
            }
            self.arrange(None);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn configure_request(
        &mut self,
        window: WindowHandle,
        geometry: Rect,
        border_width: Option<i32>,
        has_x: bool,
        has_y: bool,
        has_w: bool,
        has_h: bool,
    ) {
        let Some(client) = self.client_by_window(window) else {
            self.display
                .configure_unmanaged(window, geometry, border_width);
            self.display.sync();
            return;
        };
        let arranges = self
            .clients
            .get(client)
            .and_then(|c| self.monitors.get(c.monitor))
            .map(|m| m.layout().arranges())
            .unwrap_or(true);
        if let Some(bw) = border_width {
            if let Some(c) = self.clients.get_mut(client) {
                c.border = bw;
            }
        } else if self.clients.get(client).is_some_and(|c| c.floating) || !arranges {
            let Some(c) = self.clients.get_mut(client) else {
                return;
            };
            if has_x || has_y || has_w || has_h {
                c.old_geom = c.geom;
            }
            let mut g = c.geom;
            if has_x {
                g = g.at(geometry.x(), g.y());
            }
            if has_y {
                g = g.at(g.x(), geometry.y());
            }
            if has_w {
                g = g.with_size(geometry.width(), g.height());
            }
            if has_h {
                g = g.with_size(g.width(), geometry.height());
            }
            c.geom = g;
            let (floating, border, home) = (c.floating, c.border, c.monitor);

            // Bounds-check against whichever monitor holds at least half of
            // the window, falling back to its own.
            let mut bounds = home;
            if floating {
                for &mon in &self.mon_order {
                    let Some(m) = self.monitors.get(mon) else {
                        continue;
                    };
                    let mid = g.x() + g.width() / 2;
                    if mid > m.dim.x() && mid < m.dim.right() {
                        bounds = mon;
                        break;
                    }
                }
            }
            if let Some(m) = self.monitors.get(bounds) {
                let dim = m.dim;
                let (tw, th) = (g.width() + 2 * border, g.height() + 2 * border);
                if g.x() + border > dim.right() && floating {
                    g = g.at(dim.x() + dim.width() / 2 - tw / 2, g.y());
                }
                if g.y() + border > dim.bottom() && floating {
                    g = g.at(g.x(), dim.y() + dim.height() / 2 - th / 2);
                }
            }
            if let Some(c) = self.clients.get_mut(client) {
                c.geom = g;
            }
            if (has_x || has_y) && !(has_w || has_h) {
                self.notify_current_config(client);
            }
            let visible = self
                .clients
                .get(client)
                .and_then(|c| self.monitors.get(c.monitor).map(|m| m.shows(c.tags)))
                .unwrap_or(false);
            if visible {
                let border = self.clients.get(client).map(|c| c.border).unwrap_or(0);
                self.display.configure(window, g, border);
            }
        } else {
            self.notify_current_config(client);
        }
        self.display.sync();
    }

    fn client_message(&mut self, window: WindowHandle, message: ClientMessage) {
        let Some(client) = self.client_by_window(window) else {
            return;
        };
        match message {
            ClientMessage::SetFullscreen(action) => {
                let current = self.clients.get(client).is_some_and(|c| c.fullscreen);
                let want = match action {
                    FullscreenAction::Add => true,
                    FullscreenAction::Remove => false,
                    FullscreenAction::Toggle => !current,
                };
                self.set_fullscreen(client, want);
            }
            ClientMessage::Activate => {
                let c = self.clients.get(client);
                if c.is_some_and(|c| !c.urgent && c.seats.is_empty()) {
                    self.set_urgent(client, true);
                }
            }
        }
    }

    fn property_changed(&mut self, window: Option<WindowHandle>, property: Property) {
        let Some(window) = window else {
            // Root title carries the external status text.
            if property == Property::Title {
                self.bars_dirty();
            }
            return;
        };
        let Some(client) = self.client_by_window(window) else {
            return;
        };
        match property {
            Property::TransientFor => {
                let floating = self.clients.get(client).is_some_and(|c| c.floating);
                if !floating {
                    if let Some(parent) = self.display.transient_for(window) {
                        let parent_managed = self.client_by_window(parent).is_some();
                        self.set_floating(client, parent_managed, false, true);
                    }
                }
            }
            Property::SizeHints => {
                if let Some(c) = self.clients.get_mut(client) {
                    c.hints_valid = false;
                }
            }
            Property::WmHints => {
                self.update_wm_hints(client);
                self.bars_dirty();
            }
            Property::Title => {
                self.update_title(client);
                if let Some(c) = self.clients.get(client) {
                    if !c.seats.is_empty() {
                        if let Some(m) = self.monitors.get(c.monitor) {
                            self.display.bar_dirty(m.num);
                        }
                    }
                }
            }
            Property::WindowType => {
                self.update_window_type(client);
            }
        }
    }

    fn button_press(
        &mut self,
        device: DeviceId,
        window: Option<WindowHandle>,
        button: u32,
        time: u64,
    ) {
        let Some(seat) = self.seat_of_device(device) else {
            return;
        };
        let selmon = self.seats.get(seat).and_then(|s| s.sel_monitor);
        if let Some(m) = self.win_to_mon(seat, window) {
            if Some(m) != selmon {
                self.unfocus(seat, true);
                self.select_monitor(seat, m);
                self.focus(seat, None);
            }
        }
        if let Some(c) = window.and_then(|w| self.client_by_window(w)) {
            self.focus(seat, Some(c));
        }
        if let Some(s) = self.seats.get_mut(seat) {
            s.last_event_time = time;
            s.last_button = button;
        }
    }

    fn button_release(&mut self, device: DeviceId, button: u32, time: u64) {
        let Some(seat) = self.seat_of_device(device) else {
            return;
        };
        let Some(s) = self.seats.get_mut(seat) else {
            return;
        };
        s.last_event_time = time;

        let (finished_move, client) = if s.move_drag.client.is_some() && s.move_drag.button == button
        {
            (true, s.move_drag.client)
        } else if s.resize_drag.client.is_some() && s.resize_drag.button == button {
            (false, s.resize_drag.client)
        } else {
            return;
        };
        let both = s.move_drag.client.is_some() && s.resize_drag.client.is_some();
        let other_button = if finished_move {
            s.resize_drag.button
        } else {
            s.move_drag.button
        };
        if finished_move {
            s.move_drag.client = None;
        } else {
            s.resize_drag.client = None;
        }
        if both {
            // The other drag is still held; hand the grab over to it.
            s.last_button = other_button;
            if finished_move {
                self.start_resize(seat);
            } else {
                self.start_move(seat);
            }
        } else if let Some(ptr) = self.seats.get(seat).and_then(|s| s.pointer) {
            self.display.ungrab_pointer(ptr);
        }
        if let Some(c) = client {
            self.reattach_after_move(seat, c);
        }
    }

    /// After a drag ends (or crosses screens), a floating client follows the
    /// monitor it mostly sits on.
    pub fn reattach_after_move(&mut self, seat: SeatId, client: ClientId) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        if !c.floating {
            return;
        }
        let target = if c.fullscreen {
            let Some((x, y)) = self
                .seats
                .get(seat)
                .and_then(|s| s.pointer)
                .and_then(|p| self.display.pointer_position(p))
            else {
                return;
            };
            self.rect_to_mon(seat, x, y, 1, 1)
        } else {
            let g = c.geom;
            self.rect_to_mon(seat, g.x(), g.y(), g.width(), g.height())
        };
        let Some(target) = target else {
            return;
        };
        if self.seats.get(seat).and_then(|s| s.sel_monitor) != Some(target) {
            self.send_to_monitor(seat, client, target, false);
            self.select_monitor(seat, target);
        }
    }

    fn motion(
        &mut self,
        device: DeviceId,
        window: Option<WindowHandle>,
        child: Option<WindowHandle>,
        root_x: i32,
        root_y: i32,
        time: u64,
    ) {
        let Some(seat) = self.seat_of_device(device) else {
            return;
        };
        // A bar window with no child counts as root for monitor switching.
        let mut bar_mon = None;
        let subject = match child {
            Some(c) => Some(c),
            None => {
                if let Some(w) = window {
                    bar_mon = self
                        .mon_order
                        .iter()
                        .copied()
                        .find(|&m| self.monitors.get(m).is_some_and(|m| m.bar_win == Some(w)));
                    if bar_mon.is_some() {
                        None
                    } else {
                        Some(w)
                    }
                } else {
                    None
                }
            }
        };

        let (move_drag, resize_drag) = {
            let Some(s) = self.seats.get(seat) else {
                return;
            };
            (s.move_drag, s.resize_drag)
        };

        if subject.is_none() && move_drag.client.is_none() && resize_drag.client.is_none() {
            let m = bar_mon.or_else(|| self.rect_to_mon(seat, root_x, root_y, 1, 1));
            let selmon = self.seats.get(seat).and_then(|s| s.sel_monitor);
            if let Some(m) = m {
                if Some(m) != selmon {
                    self.select_monitor(seat, m);
                    self.focus(seat, None);
                }
            }
        }

        let snap = self.config.snap;
        if let Some(c) = move_drag.client.filter(|_| resize_drag.time < move_drag.time) {
            if time.saturating_sub(move_drag.time) <= MOTION_INTERVAL_MS {
                return;
            }
            if let Some(s) = self.seats.get_mut(seat) {
                s.move_drag.time = time;
            }
            let Some(cl) = self.clients.get(c) else {
                return;
            };
            let (tw, th, geom, floating, fullscreen) = (
                cl.total_width(),
                cl.total_height(),
                cl.geom,
                cl.floating,
                cl.fullscreen,
            );
            let mut nx = move_drag.ox + (root_x - move_drag.x);
            let mut ny = move_drag.oy + (root_y - move_drag.y);

            let selmon = self.seats.get(seat).and_then(|s| s.sel_monitor);
            let (area, arranges) = match selmon.and_then(|m| self.monitors.get(m)) {
                Some(m) => (m.area, m.layout().arranges()),
                None => return,
            };
            if (area.x() - nx).abs() < snap {
                nx = area.x();
            } else if (area.right() - (nx + tw)).abs() < snap {
                nx = area.right() - tw;
            }
            if (area.y() - ny).abs() < snap {
                ny = area.y();
            } else if (area.bottom() - (ny + th)).abs() < snap {
                ny = area.bottom() - th;
            }

            if !floating
                && arranges
                && ((nx - geom.x()).abs() > snap || (ny - geom.y()).abs() > snap)
            {
                self.set_floating(c, true, false, true);
            }
            let floating = self.clients.get(c).is_some_and(|c| c.floating);
            if !arranges || floating {
                if !fullscreen {
                    self.resize(c, geom.at(nx, ny), true);
                }
                self.reattach_after_move(seat, c);
            }
        } else if let Some(c) = resize_drag
            .client
            .filter(|_| resize_drag.time > move_drag.time)
        {
            if time.saturating_sub(resize_drag.time) <= MOTION_INTERVAL_MS {
                return;
            }
            if let Some(s) = self.seats.get_mut(seat) {
                s.resize_drag.time = time;
            }
            let Some(cl) = self.clients.get(c) else {
                return;
            };
            let (border, geom, floating, fullscreen, home) =
                (cl.border, cl.geom, cl.floating, cl.fullscreen, cl.monitor);
            let nw = max(root_x - resize_drag.ox - 2 * border + 1, 1);
            let nh = max(root_y - resize_drag.oy - 2 * border + 1, 1);

            let selmon = self.seats.get(seat).and_then(|s| s.sel_monitor);
            let (area, arranges) = match selmon.and_then(|m| self.monitors.get(m)) {
                Some(m) => (m.area, m.layout().arranges()),
                None => return,
            };
            let home_area = match self.monitors.get(home) {
                Some(m) => m.area,
                None => return,
            };
            let in_bounds = home_area.x() + nw >= area.x()
                && home_area.x() + nw <= area.right()
                && home_area.y() + nh >= area.y()
                && home_area.y() + nh <= area.bottom();
            if in_bounds
                && !floating
                && arranges
                && ((nw - geom.width()).abs() > snap || (nh - geom.height()).abs() > snap)
            {
                self.set_floating(c, true, false, true);
            }
            let floating = self.clients.get(c).is_some_and(|c| c.floating);
            if !arranges || floating {
                if !fullscreen {
                    self.resize(c, geom.with_size(nw, nh), true);
                }
                self.reattach_after_move(seat, c);
            }
        }
    }

    fn enter(&mut self, device: DeviceId, window: Option<WindowHandle>) {
        let Some(seat) = self.seat_of_device(device) else {
            return;
        };
        let selmon = self.seats.get(seat).and_then(|s| s.sel_monitor);
        // Crossings generated by an in-flight rearrangement are stale.
        if self.forcing_focus
            || selmon
                .and_then(|m| self.monitors.get(m))
                .is_some_and(|m| m.arranging)
        {
            return;
        }
        let client = window.and_then(|w| self.client_by_window(w));
        let m = client
            .and_then(|c| self.clients.get(c))
            .map(|c| c.monitor)
            .or_else(|| window.and_then(|w| self.any_win_to_mon(w)));
        if m != selmon {
            self.unfocus(seat, true);
            if let Some(m) = m {
                self.select_monitor(seat, m);
            }
        } else if client.is_none() || client == self.seats.get(seat).and_then(|s| s.focus) {
            return;
        }
        self.focus(seat, client);
    }

    fn focus_in(&mut self, device: DeviceId, window: Option<WindowHandle>) {
        let Some(seat) = self.seat_of_device(device) else {
            return;
        };
        let Some(sel) = self.seats.get(seat).and_then(|s| s.focus) else {
            return;
        };
        let win = self.clients.get(sel).map(|c| c.window);
        // A client stole focus; give it back to the seat's selection.
        if win.is_some() && window != win {
            self.keyboard_focus(seat, sel);
        }
    }
}
