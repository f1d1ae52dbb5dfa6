//! Renderer - draws the world map and handles place inspection.
//!
//! Drawing is a pure function of the [`World`]: every call produces a full
//! [`MapDrawing`] (clear and redraw). [`MapView`] layers the interactive
//! state on top: hit-testing pins, the open place card, and the fast travel
//! callback.

use serde::{Deserialize, Serialize};

use world_graph::{Place, PlaceId, RelationType, World};

const PIN_COLOR: &str = "#38bdf8";
const EDGE_COLOR: &str = "rgba(148,163,184,0.55)";
const LABEL_COLOR: &str = "#e5e7eb";

/// Drawing target dimensions. Normalized coordinates are scaled to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
    pub pin_radius: f64,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 420.0,
            pin_radius: 6.0,
        }
    }
}

impl Surface {
    fn project(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (x * self.width, y * self.height)
    }
}

/// One line per relation.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLine {
    pub from: PlaceId,
    pub to: PlaceId,
    pub relation_type: RelationType,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// One pin per place: filled once visited, labeled with the name.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub place_id: PlaceId,
    pub label: String,
    pub cx: f64,
    pub cy: f64,
    pub filled: bool,
}

/// Visited/total counter shown next to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisitSummary {
    pub visited: usize,
    pub total: usize,
}

impl std::fmt::Display for VisitSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} visited", self.visited, self.total)
    }
}

/// A complete frame of the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDrawing {
    pub width: f64,
    pub height: f64,
    pub pin_radius: f64,
    pub edges: Vec<EdgeLine>,
    pub pins: Vec<Pin>,
    pub summary: VisitSummary,
}

impl MapDrawing {
    pub fn empty(surface: &Surface) -> Self {
        Self {
            width: surface.width,
            height: surface.height,
            pin_radius: surface.pin_radius,
            edges: Vec::new(),
            pins: Vec::new(),
            summary: VisitSummary::default(),
        }
    }

    /// The pin nearest to `(x, y)` within twice the pin radius.
    pub fn pin_at(&self, x: f64, y: f64) -> Option<&Pin> {
        let reach = self.pin_radius * 2.0;
        self.pins
            .iter()
            .map(|pin| (pin, (pin.cx - x).hypot(pin.cy - y)))
            .filter(|(_, d)| *d <= reach)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(pin, _)| pin)
    }

    /// Serialize as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {} {}\">\n",
            self.width, self.height
        );
        for edge in &self.edges {
            svg.push_str(&format!(
                "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" \
                 stroke=\"{EDGE_COLOR}\" stroke-width=\"1.5\" data-type=\"{}\"/>\n",
                edge.x1,
                edge.y1,
                edge.x2,
                edge.y2,
                edge.relation_type.as_str()
            ));
        }
        for pin in &self.pins {
            let fill = if pin.filled { PIN_COLOR } else { "transparent" };
            svg.push_str(&format!(
                "  <g data-place=\"{}\" style=\"cursor:pointer\">\
                 <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{}\" fill=\"{fill}\" \
                 stroke=\"{PIN_COLOR}\" stroke-width=\"1.5\"/>\
                 <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"10\" fill=\"{LABEL_COLOR}\">{}</text></g>\n",
                escape(pin.place_id.as_str()),
                pin.cx,
                pin.cy,
                self.pin_radius,
                pin.cx + 9.0,
                pin.cy - 9.0,
                escape(&pin.label)
            ));
        }
        svg.push_str("</svg>\n");
        svg
    }
}

/// Draw the whole world onto `surface`.
///
/// Places the layout engine has not positioned yet are left out, as are the
/// relations touching them. The summary always counts every place.
pub fn render(world: &World, surface: &Surface) -> MapDrawing {
    let edges = world
        .relations()
        .iter()
        .filter_map(|r| {
            let a = world.place(&r.a)?.position()?;
            let b = world.place(&r.b)?.position()?;
            let (x1, y1) = surface.project(a);
            let (x2, y2) = surface.project(b);
            Some(EdgeLine {
                from: r.a.clone(),
                to: r.b.clone(),
                relation_type: r.relation_type,
                x1,
                y1,
                x2,
                y2,
            })
        })
        .collect();

    let pins = world
        .places()
        .filter_map(|p| {
            let (cx, cy) = surface.project(p.position()?);
            Some(Pin {
                place_id: p.id.clone(),
                label: p.name.clone(),
                cx,
                cy,
                filled: p.visited,
            })
        })
        .collect();

    MapDrawing {
        width: surface.width,
        height: surface.height,
        pin_radius: surface.pin_radius,
        edges,
        pins,
        summary: VisitSummary {
            visited: world.visited_count(),
            total: world.place_count(),
        },
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Inspection panel for a single place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceCard {
    pub place_id: PlaceId,
    pub name: String,
    /// Comma-separated tags, or a dash when there are none.
    pub tags: String,
    pub notes: String,
}

impl PlaceCard {
    pub fn for_place(place: &Place) -> Self {
        let tags = if place.tags.is_empty() {
            "—".to_string()
        } else {
            place.tags.join(", ")
        };
        let notes = if place.notes.is_empty() {
            "No notes yet.".to_string()
        } else {
            place.notes.clone()
        };
        Self {
            place_id: place.id.clone(),
            name: place.name.clone(),
            tags,
            notes,
        }
    }
}

type FastTravelFn = Box<dyn FnMut(&Place)>;

/// Interactive map: the last drawing, the open card, and fast travel.
pub struct MapView {
    surface: Surface,
    drawing: MapDrawing,
    open_card: Option<PlaceCard>,
    on_fast_travel: Option<FastTravelFn>,
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("surface", &self.surface)
            .field("pins", &self.drawing.pins.len())
            .field("open_card", &self.open_card)
            .field("fast_travel", &self.on_fast_travel.is_some())
            .finish()
    }
}

impl MapView {
    pub fn new(surface: Surface) -> Self {
        let drawing = MapDrawing::empty(&surface);
        Self {
            surface,
            drawing,
            open_card: None,
            on_fast_travel: None,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Replace the current frame with a fresh drawing of `world`.
    pub fn redraw(&mut self, world: &World) -> &MapDrawing {
        self.drawing = render(world, &self.surface);
        &self.drawing
    }

    pub fn drawing(&self) -> &MapDrawing {
        &self.drawing
    }

    pub fn summary(&self) -> VisitSummary {
        self.drawing.summary
    }

    /// Place under a point on the surface, per the last drawing.
    pub fn pin_at(&self, x: f64, y: f64) -> Option<&PlaceId> {
        self.drawing.pin_at(x, y).map(|pin| &pin.place_id)
    }

    /// Register the callback invoked with the full place on fast travel.
    pub fn set_on_fast_travel<F>(&mut self, callback: F)
    where
        F: FnMut(&Place) + 'static,
    {
        self.on_fast_travel = Some(Box::new(callback));
    }

    /// Open the card for a place. Unknown ids leave the view unchanged.
    pub fn open_place_card(&mut self, world: &World, id: &PlaceId) -> Option<&PlaceCard> {
        let place = world.place(id)?;
        self.open_card = Some(PlaceCard::for_place(place));
        self.open_card.as_ref()
    }

    /// Click at a surface point: opens the card of the pin there, if any.
    pub fn click(&mut self, world: &World, x: f64, y: f64) -> Option<&PlaceCard> {
        let id = self.pin_at(x, y)?.clone();
        self.open_place_card(world, &id)
    }

    pub fn open_card(&self) -> Option<&PlaceCard> {
        self.open_card.as_ref()
    }

    pub fn close_place_card(&mut self) {
        self.open_card = None;
    }

    /// "Travel here" on the open card: closes it and hands the place to the
    /// fast travel callback. Returns whether the callback ran.
    pub fn travel_from_card(&mut self, world: &World) -> bool {
        let Some(card) = self.open_card.take() else {
            return false;
        };
        let place = world.place(&card.place_id);
        let (Some(place), Some(callback)) = (place, self.on_fast_travel.as_mut()) else {
            return false;
        };
        callback(place);
        true
    }
}
