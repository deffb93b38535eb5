//! Size-hint resolution. Turns a requested geometry into one the client's
//! hints allow, clamping to the screen during interactive moves and to the
//! monitor otherwise.

use crate::{client::ClientId, rect::Rect, state::Wm};

impl Wm {
    /// Resolve `target` against the client's size hints. Returns the resolved
    /// rectangle and whether it differs from the client's current geometry.
    ///
    /// `interactive` requests the looser clamping used during pointer drags:
    /// the window only has to stay partially on the combined screen instead
    /// of inside its monitor's usable area.
    pub fn apply_size_hints(
        &mut self,
        client: ClientId,
        target: Rect,
        interactive: bool,
    ) -> (Rect, bool) {
        let Some(c) = self.clients.get(client) else {
            return (target, false);
        };
        let border = c.border;
        let monitor = c.monitor;

        let mut w = target.width().max(1);
        let mut h = target.height().max(1);
        let mut x = target.x();
        let mut y = target.y();

        if interactive {
            if x > self.screen_w {
                x = self.screen_w - (w + 2 * border);
            }
            if y > self.screen_h {
                y = self.screen_h - (h + 2 * border);
            }
            if x + w + 2 * border < 0 {
                x = 0;
            }
            if y + h + 2 * border < 0 {
                y = 0;
            }
        } else if let Some(m) = self.monitors.get(monitor) {
            let area = m.area;
            if x >= area.right() {
                x = area.right() - (w + 2 * border);
            }
            if y >= area.bottom() {
                y = area.bottom() - (h + 2 * border);
            }
            if x + w + 2 * border <= area.x() {
                x = area.x();
            }
            if y + h + 2 * border <= area.y() {
                y = area.y();
            }
        }
        // Windows never shrink below bar height in either dimension.
        h = h.max(self.bar_height);
        w = w.max(self.bar_height);

        let (floating, arranges) = {
            let Some(c) = self.clients.get(client) else {
                return (target, false);
            };
            let arranges = self
                .monitors
                .get(c.monitor)
                .map(|m| m.layout().arranges())
                .unwrap_or(true);
            (c.floating, arranges)
        };
        if self.config.resize_hints || floating || !arranges {
            if !self.clients.get(client).is_some_and(|c| c.hints_valid) {
                // Hints are fetched lazily; most tiled resizes never get here.
                self.update_size_hints(client);
            }
            let Some(c) = self.clients.get(client) else {
                return (target, false);
            };
            let hints = c.hints;
            let base_is_min = hints.base_w == hints.min_w && hints.base_h == hints.min_h;
            if !base_is_min {
                // Temporarily remove base dimensions for aspect calculation.
                w -= hints.base_w;
                h -= hints.base_h;
            }
            if hints.min_aspect > 0.0 && hints.max_aspect > 0.0 {
                if hints.max_aspect < w as f64 / h as f64 {
                    w = (h as f64 * hints.max_aspect + 0.5) as i32;
                } else if hints.min_aspect < h as f64 / w as f64 {
                    h = (w as f64 * hints.min_aspect + 0.5) as i32;
                }
            }
            if base_is_min {
                w -= hints.base_w;
                h -= hints.base_h;
            }
            if hints.inc_w > 0 {
                w -= w % hints.inc_w;
            }
            if hints.inc_h > 0 {
                h -= h % hints.inc_h;
            }
            w = (w + hints.base_w).max(hints.min_w);
            h = (h + hints.base_h).max(hints.min_h);
            if hints.max_w > 0 {
                w = w.min(hints.max_w);
            }
            if hints.max_h > 0 {
                h = h.min(hints.max_h);
            }
        }

        let resolved = Rect::new(x, y, w, h);
        let changed = self
            .clients
            .get(client)
            .map(|c| c.geom != resolved)
            .unwrap_or(false);
        (resolved, changed)
    }
}
