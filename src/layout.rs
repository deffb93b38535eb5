//! Pure arrangement math. Each arranger maps the tiled clients of a monitor
//! to target rectangles inside the usable area; the arrangement driver in
//! `monitor` feeds those through the geometry resolver and the display
//! server.

use crate::{client::ClientId, rect::Rect};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LayoutKind {
    Tile,
    Floating,
    Monocle,
    CenteredMaster,
}

impl LayoutKind {
    pub fn symbol(self) -> &'static str {
        match self {
            LayoutKind::Tile => "[]=",
            LayoutKind::Floating => "><>",
            LayoutKind::Monocle => "[M]",
            LayoutKind::CenteredMaster => ">M<",
        }
    }

    /// Floating is the absence of an arranger.
    pub fn arranges(self) -> bool {
        self != LayoutKind::Floating
    }
}

/// Monocle overrides its symbol with the visible-client count.
pub fn monocle_symbol(visible: usize) -> String {
    format!("[{}]", visible)
}

/// Inputs shared by all arrangers.
#[derive(Copy, Clone, Debug)]
pub struct LayoutParams {
    /// Usable area of the monitor (bar already subtracted).
    pub area: Rect,
    pub nmaster: i32,
    pub mfact: f64,
    /// Master column on the right instead of the left.
    pub rmaster: bool,
    pub gap: i32,
}

/// One tiled client: handle plus its border width. The produced rect is the
/// interior size, borders excluded, matching what the resolver consumes.
pub type Slot = (ClientId, i32);

pub fn arrange(kind: LayoutKind, params: &LayoutParams, slots: &[Slot]) -> Vec<(ClientId, Rect)> {
    match kind {
        LayoutKind::Tile => tile(params, slots),
        LayoutKind::Floating => Vec::new(),
        LayoutKind::Monocle => monocle(params, slots),
        LayoutKind::CenteredMaster => centered_master(params, slots),
    }
}

fn tile(p: &LayoutParams, slots: &[Slot]) -> Vec<(ClientId, Rect)> {
    let n = slots.len() as i32;
    if n == 0 {
        return Vec::new();
    }
    let area = p.area;
    let gap = p.gap;
    let mw = if n > p.nmaster {
        if p.nmaster > 0 {
            let f = if p.rmaster { 1.0 - p.mfact } else { p.mfact };
            ((area.width() + gap) as f64 * f) as i32
        } else {
            0
        }
    } else {
        area.width() - gap
    };
    let mut out = Vec::with_capacity(slots.len());
    let mut my = gap;
    let mut ty = gap;
    for (i, &(c, bw)) in slots.iter().enumerate() {
        let i = i as i32;
        if i < p.nmaster {
            let r = n.min(p.nmaster) - i;
            let h = (area.height() - my - gap - gap * (r - 1)) / r;
            let x = if p.rmaster {
                area.x() + area.width() - mw
            } else {
                area.x() + gap
            };
            out.push((c, Rect::new(x, area.y() + my, mw - 2 * bw - gap, h - 2 * bw)));
            my += h + gap;
        } else {
            let r = n - i;
            let h = (area.height() - ty - gap - gap * (r - 1)) / r;
            let x = if p.rmaster {
                area.x()
            } else {
                area.x() + mw + gap
            };
            out.push((
                c,
                Rect::new(
                    x,
                    area.y() + ty,
                    area.width() - mw - 2 * bw - 2 * gap,
                    h - 2 * bw,
                ),
            ));
            ty += h + gap;
        }
    }
    out
}

fn monocle(p: &LayoutParams, slots: &[Slot]) -> Vec<(ClientId, Rect)> {
    let area = p.area;
    slots
        .iter()
        .map(|&(c, bw)| {
            (
                c,
                Rect::new(
                    area.x(),
                    area.y(),
                    area.width() - 2 * bw,
                    area.height() - 2 * bw,
                ),
            )
        })
        .collect()
}

fn centered_master(p: &LayoutParams, slots: &[Slot]) -> Vec<(ClientId, Rect)> {
    let n = slots.len() as i32;
    if n == 0 {
        return Vec::new();
    }
    let area = p.area;
    // Leave the master column empty until enough stack clients exist to
    // flank it on both sides.
    let nm = p.nmaster.min((n - 2).max(0));
    let mut mw = area.width();
    let mut mx = 0;
    let mut tw = mw;
    if n > nm {
        mw = if nm > 0 {
            (area.width() as f64 * p.mfact) as i32
        } else {
            0
        };
        tw = area.width() - mw;
        if n - nm > 1 {
            mx = (area.width() - mw) / 2;
            tw = (area.width() - mw) / 2;
        }
    }
    let mut out = Vec::with_capacity(slots.len());
    let mut my = 0;
    let mut oty = 0;
    let mut ety = 0;
    for (i, &(c, bw)) in slots.iter().enumerate() {
        let i = i as i32;
        if i < nm {
            let h = (area.height() - my) / (n.min(nm) - i);
            out.push((
                c,
                Rect::new(area.x() + mx, area.y() + my, mw - 2 * bw, h - 2 * bw),
            ));
            my += h;
        } else if (i - nm) % 2 == 1 {
            let h = (area.height() - ety) / ((1 + n - i) / 2);
            out.push((c, Rect::new(area.x(), area.y() + ety, tw - 2 * bw, h - 2 * bw)));
            ety += h;
        } else {
            let h = (area.height() - oty) / ((1 + n - i) / 2);
            out.push((
                c,
                Rect::new(area.x() + mx + mw, area.y() + oty, tw - 2 * bw, h - 2 * bw),
            ));
            oty += h;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use {super::*, crate::arena::Arena};

    fn ids(n: usize) -> Vec<ClientId> {
        let mut arena: Arena<ClientId, ()> = Default::default();
        (0..n).map(|_| arena.insert(())).collect()
    }

    fn params(w: i32, h: i32, nmaster: i32, mfact: f64) -> LayoutParams {
        LayoutParams {
            area: Rect::new(0, 0, w, h),
            nmaster,
            mfact,
            rmaster: false,
            gap: 0,
        }
    }

    #[test]
    fn tile_master_and_stack() {
        let c = ids(3);
        let slots: Vec<Slot> = c.iter().map(|&c| (c, 0)).collect();
        let p = params(1000, 800, 1, 0.6);
        let rects = tile(&p, &slots);
        assert_eq!(rects[0].1, Rect::new(0, 0, 600, 800));
        assert_eq!(rects[1].1, Rect::new(600, 0, 400, 400));
        assert_eq!(rects[2].1, Rect::new(600, 400, 400, 400));
    }

    #[test]
    fn tile_rmaster_mirrors() {
        let c = ids(2);
        let slots: Vec<Slot> = c.iter().map(|&c| (c, 0)).collect();
        let mut p = params(1000, 800, 1, 0.6);
        p.rmaster = true;
        let rects = tile(&p, &slots);
        // With rmaster the master column takes 1 - mfact on the right.
        assert_eq!(rects[0].1, Rect::new(600, 0, 400, 800));
        assert_eq!(rects[1].1, Rect::new(0, 0, 600, 800));
    }

    #[test]
    fn tile_single_client_fills_area() {
        let c = ids(1);
        let slots: Vec<Slot> = vec![(c[0], 2)];
        let p = params(1000, 800, 1, 0.55);
        let rects = tile(&p, &slots);
        assert_eq!(rects[0].1, Rect::new(0, 0, 996, 796));
    }

    #[test]
    fn tile_gaps() {
        let c = ids(2);
        let slots: Vec<Slot> = c.iter().map(|&c| (c, 0)).collect();
        let mut p = params(1000, 800, 1, 0.5);
        p.gap = 10;
        let rects = tile(&p, &slots);
        // Master: (1000 + 10) * 0.5 = 505 wide slot, minus inner gap.
        assert_eq!(rects[0].1, Rect::new(10, 10, 495, 780));
        assert_eq!(rects[1].1, Rect::new(515, 10, 475, 780));
    }

    #[test]
    fn monocle_stacks_everything() {
        let c = ids(3);
        let slots: Vec<Slot> = c.iter().map(|&c| (c, 1)).collect();
        let p = params(1000, 800, 1, 0.55);
        let rects = monocle(&p, &slots);
        for (_, r) in rects {
            assert_eq!(r, Rect::new(0, 0, 998, 798));
        }
        assert_eq!(monocle_symbol(3), "[3]");
    }

    #[test]
    fn centered_master_caps_masters() {
        // Four clients, nmaster 3: only min(3, 4 - 2) = 2 go in the middle.
        let c = ids(4);
        let slots: Vec<Slot> = c.iter().map(|&c| (c, 0)).collect();
        let p = params(900, 600, 3, 0.5);
        let rects = centered_master(&p, &slots);
        let mw = 450;
        let mx = (900 - mw) / 2;
        assert_eq!(rects[0].1, Rect::new(mx, 0, mw, 300));
        assert_eq!(rects[1].1, Rect::new(mx, 300, mw, 300));
        // The two stack clients flank the master column.
        assert_eq!(rects[2].1.x(), mx + mw);
        assert_eq!(rects[3].1.x(), 0);
    }

    #[test]
    fn centered_master_two_clients_have_no_master() {
        let c = ids(2);
        let slots: Vec<Slot> = c.iter().map(|&c| (c, 0)).collect();
        let p = params(900, 600, 1, 0.5);
        let rects = centered_master(&p, &slots);
        // nm = 0: both clients stack, first on the right half.
        assert_eq!(rects[0].1, Rect::new(450, 0, 450, 600));
        assert_eq!(rects[1].1, Rect::new(0, 0, 450, 600));
    }
}
