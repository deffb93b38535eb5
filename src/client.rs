//! Client lifecycle: adoption of windows into management, release, and the
//! floating / fullscreen state machine.

use {
    crate::{
        backend::{BorderScheme, Gravity, SizeHints, StackLayer, WindowAttrs, WindowHandle},
        monitor::MonitorId,
        rect::Rect,
        seat::SeatId,
        state::Wm,
    },
    smallvec::SmallVec,
};

arena_ids!(ClientId);

/// How special a window is. Dialogs float, fullscreen windows bypass border
/// styling entirely.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub enum WindowKind {
    Normal,
    Dialog,
    Fullscreen,
}

pub struct Client {
    pub window: WindowHandle,
    pub monitor: MonitorId,
    pub title: String,
    /// Multi-seat prefix label, e.g. `[3, 11]`.
    pub label: String,

    pub geom: Rect,
    pub old_geom: Rect,
    pub border: i32,
    pub old_border: i32,

    pub hints: SizeHints,
    pub hints_valid: bool,

    pub tags: u32,
    pub floating: bool,
    /// Floating state to restore when leaving fullscreen.
    pub old_floating: bool,
    pub fullscreen: bool,
    pub urgent: bool,
    pub fixed: bool,
    pub never_focus: bool,
    pub managed: bool,
    /// Button grabs enabled; the per-client mouse toggle clears this.
    pub grabbed: bool,
    /// Force the next resolver pass to push geometry even when it reports no
    /// change.
    pub dirty_resize: bool,

    /// Seats focusing this client, in focus order.
    pub seats: SmallVec<[SeatId; 2]>,
}

impl Client {
    pub fn total_width(&self) -> i32 {
        self.geom.width() + 2 * self.border
    }

    pub fn total_height(&self) -> i32 {
        self.geom.height() + 2 * self.border
    }
}

impl Wm {
    /// Adopt a window. `attrs` is the attribute snapshot taken when the map
    /// request arrived.
    pub fn manage(&mut self, window: WindowHandle, attrs: WindowAttrs) {
        log::debug!("manage {}", window);
        let pinned = self.pinned.is_some();

        let mut transient_parent = None;
        if let Some(t) = self.display.transient_for(window) {
            transient_parent = self.client_by_window(t);
        }
        let (monitor, tags, apply_rules) = if let Some(parent) =
            transient_parent.and_then(|p| self.clients.get(p))
        {
            (parent.monitor, parent.tags, false)
        } else if let Some(monitor) = self
            .spawn_monitor
            .take()
            .or_else(|| self.spawn_seat.and_then(|s| self.seats.get(s)?.sel_monitor))
            .or_else(|| self.first_monitor())
        {
            let Some(m) = self.monitors.get(monitor) else {
                return;
            };
            (monitor, m.tagset[m.sel_tags], true)
        } else {
            fatal!("no monitor to place window {} on", window);
        };

        let client = self.clients.insert(Client {
            window,
            monitor,
            title: String::new(),
            label: String::new(),
            geom: attrs.geometry,
            old_geom: attrs.geometry,
            border: self.config.border_px,
            old_border: attrs.border_width,
            hints: SizeHints::default(),
            hints_valid: false,
            tags,
            floating: false,
            old_floating: false,
            fullscreen: false,
            urgent: false,
            fixed: false,
            never_focus: false,
            managed: false,
            grabbed: true,
            dirty_resize: true,
            seats: SmallVec::new(),
        });

        self.update_title(client);

        // Keep the window inside its monitor's usable area.
        if let (Some(c), Some(m)) = (self.clients.get(client), self.monitors.get(monitor)) {
            let mut g = c.geom;
            if g.x() + c.total_width() > m.area.right() {
                g = g.at(m.area.right() - c.total_width(), g.y());
            }
            if g.y() + c.total_height() > m.area.bottom() {
                g = g.at(g.x(), m.area.bottom() - c.total_height());
            }
            g = g.at(g.x().max(m.area.x()), g.y().max(m.area.y()));
            if let Some(c) = self.clients.get_mut(client) {
                c.geom = g;
            }
        }

        let kind = self.update_window_type(client);
        if kind < WindowKind::Fullscreen {
            let border = self.config.border_px;
            self.display.set_border_width(window, border);
            self.display
                .set_border_scheme(window, BorderScheme::Normal, pinned);
            if kind == WindowKind::Normal {
                self.notify_current_config(client);
            }
        }

        self.update_size_hints(client);
        self.update_wm_hints(client);
        if apply_rules {
            self.apply_rules(client);
        }

        for seat in self.seats.ids() {
            if let Some(ptr) = self.seats.get(seat).and_then(|s| s.pointer) {
                self.display.grab_client_buttons(ptr, window, false, true);
            }
        }

        if let Some(c) = self.clients.get_mut(client) {
            if !c.floating {
                c.floating = transient_parent.is_some() || c.fixed;
                c.old_floating = c.floating;
            }
        }

        self.attach(client);
        self.attach_stack(client);
        self.advertise_clients();
        self.display.set_withdrawn(window, false);
        self.display.sync();

        if let Some(c) = self.clients.get_mut(client) {
            c.managed = true;
        }
        // The client may have destroyed the window while we were setting up.
        if !self.display.window_exists(window) {
            log::debug!("manage {}: window vanished", window);
            self.detach(client);
            self.detach_stack(client);
            self.clients.remove(client);
            return;
        }

        let (floating, fullscreen, geom) = {
            let Some(c) = self.clients.get(client) else {
                return;
            };
            (c.floating, c.fullscreen, c.geom)
        };
        self.set_floating(client, floating, true, false);
        self.display.select_client_events(window);
        self.display.map_window(window);

        let monitor = self.clients.get(client).map(|c| c.monitor);
        if !floating && !fullscreen {
            self.arrange(monitor);
        } else {
            self.resize(client, geom, false);
        }
        if !floating {
            if let Some(seat) = self.spawn_seat.filter(|&s| self.seats.contains(s)) {
                self.focus(seat, None);
            }
        }
    }

    /// Release a client. `destroyed` skips the protocol cleanup that only
    /// makes sense while the window still exists.
    pub fn unmanage(&mut self, client: ClientId, destroyed: bool) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let (window, old_border, monitor, floating, fullscreen) =
            (c.window, c.old_border, c.monitor, c.floating, c.fullscreen);
        log::debug!("unmanage {}", window);

        self.detach(client);
        self.detach_stack(client);

        if !destroyed {
            self.display.clear_events(window);
            self.display.set_border_width(window, old_border);
            for seat in self.seats.ids() {
                if let Some(ptr) = self.seats.get(seat).and_then(|s| s.pointer) {
                    self.display.grab_client_buttons(ptr, window, false, false);
                }
            }
            self.display.set_withdrawn(window, true);
        }

        let focusing: SmallVec<[SeatId; 2]> = self
            .clients
            .get(client)
            .map(|c| c.seats.clone())
            .unwrap_or_default();
        for seat in focusing {
            let dragging = self.seats.get(seat).is_some_and(|s| {
                s.move_drag.client == Some(client) || s.resize_drag.client == Some(client)
            });
            if dragging {
                if let Some(s) = self.seats.get_mut(seat) {
                    s.move_drag.client = None;
                    s.resize_drag.client = None;
                }
                if let Some(ptr) = self.seats.get(seat).and_then(|s| s.pointer) {
                    self.display.ungrab_pointer(ptr);
                }
            }
            self.focus(seat, None);
        }

        self.clients.remove(client);
        self.advertise_clients();
        // Fullscreen clients cover everything; tiled siblings only shuffle
        // once such a client leaves.
        if !floating || fullscreen {
            self.arrange(Some(monitor));
        }
    }

    // Order-list and focus-stack maintenance.

    pub fn attach(&mut self, client: ClientId) {
        let Some(monitor) = self.clients.get(client).map(|c| c.monitor) else {
            return;
        };
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.clients.insert(0, client);
        }
    }

    pub fn attach_end(&mut self, client: ClientId) {
        let Some(monitor) = self.clients.get(client).map(|c| c.monitor) else {
            return;
        };
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.clients.push(client);
        }
    }

    pub fn detach(&mut self, client: ClientId) {
        let Some(monitor) = self.clients.get(client).map(|c| c.monitor) else {
            return;
        };
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.clients.retain(|&c| c != client);
        }
    }

    pub fn attach_stack(&mut self, client: ClientId) {
        let Some(monitor) = self.clients.get(client).map(|c| c.monitor) else {
            return;
        };
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.stack.insert(0, client);
        }
    }

    pub fn detach_stack(&mut self, client: ClientId) {
        let Some(monitor) = self.clients.get(client).map(|c| c.monitor) else {
            return;
        };
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.stack.retain(|&c| c != client);
        }
    }

    /// First non-floating visible client in order, from `from` onwards.
    pub fn next_tiled(&self, monitor: MonitorId, from: usize) -> Option<ClientId> {
        let m = self.monitors.get(monitor)?;
        m.clients[from.min(m.clients.len())..]
            .iter()
            .copied()
            .find(|&c| {
                self.clients
                    .get(c)
                    .is_some_and(|c| !c.floating && m.shows(c.tags))
            })
    }

    /// Apply placement rules. Tag bits accumulate across matching rules;
    /// floating, fullscreen and monitor are last-writer-wins.
    pub fn apply_rules(&mut self, client: ClientId) {
        let Some(c) = self.clients.get_mut(client) else {
            return;
        };
        c.floating = false;
        c.tags = 0;
        let (window, title) = (c.window, c.title.clone());
        let (class, instance) = self.display.class_instance(window);
        let tag_mask = self.config.tag_mask();
        let mut monitor_num = None;
        let mut floating = None;
        let mut fullscreen = None;
        let mut tags = 0;
        for rule in &self.config.rules {
            if !rule.matches(&class, &instance, &title) {
                continue;
            }
            log::debug!("rule matched for {}: tags {:#x}", window, rule.tags);
            if rule.floating.is_some() {
                floating = rule.floating;
            }
            if rule.fullscreen.is_some() {
                fullscreen = rule.fullscreen;
            }
            if rule.monitor.is_some() {
                monitor_num = rule.monitor;
            }
            tags |= rule.tags;
        }
        let monitor = monitor_num.and_then(|num| {
            self.mon_order
                .iter()
                .copied()
                .find(|&m| self.monitors.get(m).is_some_and(|m| m.num == num))
        });
        let Some(c) = self.clients.get_mut(client) else {
            return;
        };
        if let Some(f) = floating {
            c.floating = f;
        }
        if let Some(f) = fullscreen {
            c.fullscreen = f;
        }
        if let Some(m) = monitor {
            c.monitor = m;
        }
        c.tags = tags;
        let monitor = c.monitor;
        if c.tags & tag_mask != 0 {
            c.tags &= tag_mask;
        } else if let Some(m) = self.monitors.get(monitor) {
            let fallback = m.tagset[m.sel_tags];
            if let Some(c) = self.clients.get_mut(client) {
                c.tags = fallback;
            }
        }
    }

    // State transitions.

    pub fn set_fullscreen(&mut self, client: ClientId, fullscreen: bool) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let window = c.window;
        if fullscreen && !c.fullscreen {
            log::debug!("fullscreen {}", window);
            self.display.set_fullscreen_state(window, true);
            let dim = self.monitors.get(c.monitor).map(|m| m.dim);
            let Some(c) = self.clients.get_mut(client) else {
                return;
            };
            c.fullscreen = true;
            c.dirty_resize = true;
            c.old_floating = c.floating;
            c.old_border = c.border;
            c.border = 0;
            c.floating = true;
            if let Some(dim) = dim {
                self.resize_client(client, dim);
            }
            self.display.restack(window, StackLayer::FloatingFocused);
            self.display.set_border_width(window, 0);
        } else if !fullscreen && c.fullscreen {
            log::debug!("unfullscreen {}", window);
            self.display.set_fullscreen_state(window, false);
            let Some(c) = self.clients.get_mut(client) else {
                return;
            };
            c.fullscreen = false;
            c.floating = c.old_floating;
            c.border = c.old_border;
            c.geom = c.old_geom;
            let (floating, geom) = (c.floating, c.geom);
            if floating {
                self.resize_client(client, geom);
            } else {
                c.dirty_resize = true;
                self.set_floating(client, false, true, true);
            }
        }
    }

    /// Change floating state. `force` re-applies the current state's side
    /// effects, `should_arrange` triggers the layout pass.
    pub fn set_floating(
        &mut self,
        client: ClientId,
        floating: bool,
        force: bool,
        should_arrange: bool,
    ) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        // Fixed-size windows cannot be tiled.
        let floating = c.fixed || floating;
        let (window, monitor, geom) = (c.window, c.monitor, c.geom);
        if floating && (!c.floating || force) {
            if let Some(c) = self.clients.get_mut(client) {
                c.floating = true;
            }
            self.display.restack(window, StackLayer::FloatingFocused);
            if should_arrange {
                self.resize(client, geom, false);
                self.arrange(Some(monitor));
            }
        } else if !floating && (c.floating || force) {
            if let Some(c) = self.clients.get_mut(client) {
                c.floating = false;
            }
            self.display.restack(window, StackLayer::Tiled);
            if should_arrange {
                self.arrange(Some(monitor));
            }
        }
    }

    pub fn set_urgent(&mut self, client: ClientId, urgent: bool) {
        let Some(c) = self.clients.get_mut(client) else {
            return;
        };
        c.urgent = urgent;
        let window = c.window;
        self.display.set_urgency(window, urgent);
    }

    // Property refresh.

    pub fn update_title(&mut self, client: ClientId) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let mut title = self.display.title(c.window);
        if title.is_empty() {
            title = "broken".to_string();
        }
        if let Some(c) = self.clients.get_mut(client) {
            c.title = title;
        }
    }

    /// Re-read the window's advertised state and type, applying fullscreen
    /// and dialog side effects.
    pub fn update_window_type(&mut self, client: ClientId) -> WindowKind {
        let Some(c) = self.clients.get(client) else {
            return WindowKind::Normal;
        };
        let state = self.display.window_state(c.window);
        let mut kind = WindowKind::Normal;
        if state.fullscreen {
            self.set_fullscreen(client, true);
            kind = WindowKind::Fullscreen;
        }
        if state.dialog {
            self.set_floating(client, true, false, true);
            kind = WindowKind::Dialog;
        }
        kind
    }

    pub fn update_size_hints(&mut self, client: ClientId) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let (window, monitor, managed, was_floating) =
            (c.window, c.monitor, c.managed, c.floating);
        let hints = self.display.size_hints(window);
        let area = self.monitors.get(monitor).map(|m| m.area);
        if let (Some(area), Some(gravity)) = (area, hints.gravity) {
            let pos = match gravity {
                Gravity::North => Some((area.x() + area.width() / 2, area.y())),
                Gravity::NorthEast => Some((area.right(), area.y())),
                Gravity::West => Some((area.x(), area.y() + area.height() / 2)),
                Gravity::Center => {
                    Some((area.x() + area.width() / 2, area.y() + area.height() / 2))
                }
                Gravity::East => Some((area.right(), area.y() + area.height() / 2)),
                Gravity::SouthWest => Some((area.x(), area.bottom())),
                Gravity::South => Some((area.x() + area.width() / 2, area.bottom())),
                Gravity::SouthEast => Some((area.right(), area.bottom())),
                Gravity::Static => None,
            };
            if let (Some((x, y)), Some(c)) = (pos, self.clients.get_mut(client)) {
                c.geom = c.geom.at(x, y);
            }
        }
        let explicit = hints.explicit_size || hints.gravity.is_some();
        if let Some(c) = self.clients.get_mut(client) {
            c.hints = hints;
            c.fixed = hints.is_fixed();
            c.hints_valid = true;
        }
        // A window asking for explicit size or placement floats; tiling is
        // never forced back off here.
        if !was_floating {
            self.set_floating(client, explicit, false, managed);
        }
    }

    pub fn update_wm_hints(&mut self, client: ClientId) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let (window, focused) = (c.window, !c.seats.is_empty());
        let hints = self.display.wm_hints(window);
        if focused && hints.urgent {
            // Never leave a focused window marked urgent.
            self.display.set_urgency(window, false);
        } else if let Some(c) = self.clients.get_mut(client) {
            c.urgent = hints.urgent;
        }
        if let Some(c) = self.clients.get_mut(client) {
            c.never_focus = hints.input.map(|input| !input).unwrap_or(false);
        }
    }

    // Geometry plumbing.

    /// Resize through the hint resolver. A pending `dirty_resize` pushes the
    /// geometry even when the resolver reports no change.
    pub fn resize(&mut self, client: ClientId, target: Rect, interactive: bool) {
        let (resolved, changed) = self.apply_size_hints(client, target, interactive);
        let Some(c) = self.clients.get_mut(client) else {
            return;
        };
        if changed || c.dirty_resize {
            c.dirty_resize = false;
            self.resize_client(client, resolved);
        }
    }

    pub fn resize_client(&mut self, client: ClientId, geom: Rect) {
        let Some(c) = self.clients.get_mut(client) else {
            return;
        };
        c.old_geom = c.geom;
        c.geom = geom;
        let (window, border) = (c.window, c.border);
        self.display.configure(window, geom, border);
        self.display.notify_config(window, geom, border);
        self.display.sync();
    }

    /// Synthetic configure with the client's current geometry.
    pub fn notify_current_config(&mut self, client: ClientId) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let (window, geom, border) = (c.window, c.geom, c.border);
        self.display.notify_config(window, geom, border);
    }

    /// Move a client to another monitor, adopting that monitor's tags.
    pub fn send_to_monitor(
        &mut self,
        seat: SeatId,
        client: ClientId,
        target: MonitorId,
        refocus: bool,
    ) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let prev = c.monitor;
        if prev == target {
            return;
        }
        if refocus {
            self.unfocus(seat, true);
        }
        self.detach(client);
        self.detach_stack(client);
        let tags = self
            .monitors
            .get(target)
            .map(|m| m.tagset[m.sel_tags])
            .unwrap_or(1);
        if let Some(c) = self.clients.get_mut(client) {
            c.monitor = target;
            c.tags = tags;
        }
        self.attach(client);
        self.attach_stack(client);
        if refocus {
            self.focus(seat, None);
        }
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let (floating, fullscreen, dirty, geom) =
            (c.floating, c.fullscreen, c.dirty_resize, c.geom);
        if !floating && !fullscreen {
            self.arrange(Some(prev));
            self.arrange(Some(target));
        } else if fullscreen {
            if dirty {
                self.arrange(Some(prev));
            }
            if let Some(c) = self.clients.get_mut(client) {
                c.dirty_resize = false;
            }
            if let Some(dim) = self.monitors.get(target).map(|m| m.dim) {
                self.resize_client(client, dim);
            }
        } else {
            let mid_drag = self.seats.get(seat).is_some_and(|s| {
                s.move_drag.client == Some(client) || s.resize_drag.client == Some(client)
            });
            if !mid_drag {
                if let Some(dim) = self.monitors.get(target).map(|m| m.dim) {
                    self.resize_client(
                        client,
                        geom.at(dim.x(), dim.y()),
                    );
                }
            }
        }
    }
}
