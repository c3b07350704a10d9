//! Force-directed layout for the knowledge-graph editor.
//!
//! The simulation is an explicit stepped function: a renderer calls
//! [`ForceLayout::advance`] from whatever loop it owns. Three forces act on the
//! nodes: pairwise charge repulsion, a spring per link with a fixed rest length,
//! and a centering force that keeps the layout's mean on the canvas center. The
//! simulation "cools" through `alpha`; once alpha drops below its minimum the
//! layout is at rest and `advance` does nothing until it is reheated.
//!
//! Dragging is modelled with an explicit per-node pin holding an override
//! position. Zoom and pan live in [`ViewTransform`] and never touch stored
//! coordinates.

use rand::Rng;
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::models::{GraphDocument, Position};

pub const CHARGE_STRENGTH: f64 = -300.0;
pub const LINK_DISTANCE: f64 = 120.0;
pub const NODE_RADIUS: f64 = 22.0;
pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 3.0;

/// Alpha target while a node is being dragged.
pub const DRAG_ALPHA_TARGET: f64 = 0.3;

const ALPHA_MIN: f64 = 0.001;
const VELOCITY_DECAY: f64 = 0.4;
const INITIAL_RADIUS: f64 = 10.0;
const LINK_LABEL_OFFSET: f64 = 6.0;

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Clone)]
struct Body {
    id: String,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    pin: Option<Position>,
}

#[derive(Debug, Clone)]
struct Spring {
    source: usize,
    target: usize,
    strength: f64,
    bias: f64,
}

#[derive(Debug, Clone)]
pub struct ForceLayout {
    bodies: Vec<Body>,
    index: HashMap<String, usize>,
    springs: Vec<Spring>,
    center: Position,
    alpha: f64,
    alpha_target: f64,
    alpha_decay: f64,
}

impl ForceLayout {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            bodies: Vec::new(),
            index: HashMap::new(),
            springs: Vec::new(),
            center: Position::new(width / 2.0, height / 2.0),
            alpha: 1.0,
            alpha_target: 0.0,
            // Cools from 1 to ALPHA_MIN in 300 ticks.
            alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / 300.0),
        }
    }

    pub fn center(&self) -> Position {
        self.center
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < ALPHA_MIN && self.alpha_target < ALPHA_MIN
    }

    pub fn reheat(&mut self) {
        self.alpha = 1.0;
    }

    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Rebuild bodies and springs from a document, keeping the motion state of
    /// nodes that survive. New nodes start at their stored position, or on a
    /// phyllotaxis spiral around the center when they have none.
    pub fn sync(&mut self, doc: &GraphDocument) {
        let mut previous: HashMap<String, Body> = self
            .bodies
            .drain(..)
            .map(|b| (b.id.clone(), b))
            .collect();
        self.index.clear();

        for (i, node) in doc.nodes.iter().enumerate() {
            if self.index.contains_key(&node.id) {
                continue;
            }
            let body = match previous.remove(&node.id) {
                Some(mut body) => {
                    if let Some(pos) = node.position.filter(Position::is_finite) {
                        body.x = pos.x;
                        body.y = pos.y;
                    }
                    body
                }
                None => {
                    let pos = node
                        .position
                        .filter(Position::is_finite)
                        .unwrap_or_else(|| self.spiral_position(i));
                    Body {
                        id: node.id.clone(),
                        x: pos.x,
                        y: pos.y,
                        vx: 0.0,
                        vy: 0.0,
                        pin: None,
                    }
                }
            };
            self.index.insert(node.id.clone(), self.bodies.len());
            self.bodies.push(body);
        }

        let mut endpoints = Vec::new();
        let mut degree = vec![0usize; self.bodies.len()];
        for link in &doc.links {
            let (Some(&s), Some(&t)) = (self.index.get(&link.source_id), self.index.get(&link.target_id))
            else {
                continue;
            };
            if s == t {
                continue;
            }
            degree[s] += 1;
            degree[t] += 1;
            endpoints.push((s, t));
        }

        self.springs = endpoints
            .into_iter()
            .map(|(s, t)| Spring {
                source: s,
                target: t,
                strength: 1.0 / degree[s].min(degree[t]) as f64,
                bias: degree[s] as f64 / (degree[s] + degree[t]) as f64,
            })
            .collect();
    }

    fn spiral_position(&self, i: usize) -> Position {
        let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
        let angle = i as f64 * PI * (3.0 - 5f64.sqrt());
        Position::new(
            self.center.x + radius * angle.cos(),
            self.center.y + radius * angle.sin(),
        )
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.index.get(id).map(|&i| {
            let b = &self.bodies[i];
            Position::new(b.x, b.y)
        })
    }

    pub fn positions(&self) -> impl Iterator<Item = (&str, Position)> {
        self.bodies
            .iter()
            .map(|b| (b.id.as_str(), Position::new(b.x, b.y)))
    }

    /// Fix a node at `pos` until [`ForceLayout::unpin`] is called.
    pub fn pin(&mut self, id: &str, pos: Position) -> bool {
        if !pos.is_finite() {
            return false;
        }
        match self.index.get(id) {
            Some(&i) => {
                let body = &mut self.bodies[i];
                body.pin = Some(pos);
                body.x = pos.x;
                body.y = pos.y;
                body.vx = 0.0;
                body.vy = 0.0;
                true
            }
            None => false,
        }
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        match self.index.get(id) {
            Some(&i) => self.bodies[i].pin.take().is_some(),
            None => false,
        }
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.index
            .get(id)
            .map(|&i| self.bodies[i].pin.is_some())
            .unwrap_or(false)
    }

    /// Step the simulation by `dt` ticks. Returns false when the layout is at
    /// rest and nothing moved.
    pub fn advance(&mut self, dt: f64) -> bool {
        if self.is_settled() || !dt.is_finite() || dt <= 0.0 {
            return false;
        }

        let decay = 1.0 - (1.0 - self.alpha_decay).powf(dt);
        self.alpha += (self.alpha_target - self.alpha) * decay;
        let k = self.alpha * dt;

        self.apply_springs(k);
        self.apply_charge(k);
        self.apply_centering(dt.min(1.0));

        let keep = (1.0 - VELOCITY_DECAY).powf(dt);
        for body in &mut self.bodies {
            match body.pin {
                Some(pin) => {
                    body.x = pin.x;
                    body.y = pin.y;
                    body.vx = 0.0;
                    body.vy = 0.0;
                }
                None => {
                    body.vx *= keep;
                    body.vy *= keep;
                    body.x += body.vx * dt;
                    body.y += body.vy * dt;
                }
            }
        }

        true
    }

    fn apply_springs(&mut self, k: f64) {
        let mut rng = rand::thread_rng();
        for spring in &self.springs {
            let (s, t) = (&self.bodies[spring.source], &self.bodies[spring.target]);
            let mut dx = t.x + t.vx - s.x - s.vx;
            let mut dy = t.y + t.vy - s.y - s.vy;
            if dx == 0.0 {
                dx = jiggle(&mut rng);
            }
            if dy == 0.0 {
                dy = jiggle(&mut rng);
            }
            let len = (dx * dx + dy * dy).sqrt();
            let pull = (len - LINK_DISTANCE) / len * k * spring.strength;
            let (fx, fy) = (dx * pull, dy * pull);

            let t = &mut self.bodies[spring.target];
            t.vx -= fx * spring.bias;
            t.vy -= fy * spring.bias;
            let s = &mut self.bodies[spring.source];
            s.vx += fx * (1.0 - spring.bias);
            s.vy += fy * (1.0 - spring.bias);
        }
    }

    fn apply_charge(&mut self, k: f64) {
        let mut rng = rand::thread_rng();
        let n = self.bodies.len();
        let mut deltas = vec![(0.0, 0.0); n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut dx = self.bodies[j].x - self.bodies[i].x;
                let mut dy = self.bodies[j].y - self.bodies[i].y;
                let mut l = dx * dx + dy * dy;
                if dx == 0.0 {
                    dx = jiggle(&mut rng);
                    l += dx * dx;
                }
                if dy == 0.0 {
                    dy = jiggle(&mut rng);
                    l += dy * dy;
                }
                if l < 1.0 {
                    l = l.sqrt();
                }
                let w = CHARGE_STRENGTH * k / l;
                deltas[i].0 += dx * w;
                deltas[i].1 += dy * w;
            }
        }
        for (body, (dvx, dvy)) in self.bodies.iter_mut().zip(deltas) {
            body.vx += dvx;
            body.vy += dvy;
        }
    }

    fn apply_centering(&mut self, strength: f64) {
        if self.bodies.is_empty() {
            return;
        }
        let n = self.bodies.len() as f64;
        let mean_x = self.bodies.iter().map(|b| b.x).sum::<f64>() / n;
        let mean_y = self.bodies.iter().map(|b| b.y).sum::<f64>() / n;
        let sx = (mean_x - self.center.x) * strength;
        let sy = (mean_y - self.center.y) * strength;
        for body in &mut self.bodies {
            body.x -= sx;
            body.y -= sy;
        }
    }
}

fn jiggle(rng: &mut impl Rng) -> f64 {
    (rng.gen::<f64>() - 0.5) * 1e-6
}

// ============================================================================
// View Transform
// ============================================================================

/// Affine zoom/pan applied by the rendering layer only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            k: 1.0,
        }
    }
}

impl ViewTransform {
    /// Graph space to screen space.
    pub fn apply(&self, p: Position) -> Position {
        Position::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    /// Screen space to graph space.
    pub fn invert(&self, p: Position) -> Position {
        Position::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    /// Scale by `factor` keeping the graph point under `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: Position, factor: f64) {
        if !anchor.is_finite() || !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let focus = self.invert(anchor);
        self.k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.x = anchor.x - focus.x * self.k;
        self.y = anchor.y - focus.y * self.k;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.x += dx;
        self.y += dy;
    }
}

// ============================================================================
// Scene
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: String,
    pub label: String,
    pub center: Position,
    pub radius: f64,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneLink {
    pub id: String,
    pub from: Position,
    pub to: Position,
    pub label: String,
    pub label_at: Position,
}

/// Screen-space snapshot of the graph for a renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub links: Vec<SceneLink>,
}

impl Scene {
    pub fn build(
        doc: &GraphDocument,
        layout: &ForceLayout,
        view: &ViewTransform,
        selected: Option<&str>,
    ) -> Self {
        let nodes = doc
            .nodes
            .iter()
            .filter_map(|node| {
                let pos = layout.position(&node.id)?;
                Some(SceneNode {
                    id: node.id.clone(),
                    label: node.short_label(),
                    center: view.apply(pos),
                    radius: NODE_RADIUS * view.k,
                    selected: selected == Some(node.id.as_str()),
                })
            })
            .collect();

        let links = doc
            .links
            .iter()
            .filter_map(|link| {
                let from = layout.position(&link.source_id)?;
                let to = layout.position(&link.target_id)?;
                let mid = Position::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0 - LINK_LABEL_OFFSET);
                Some(SceneLink {
                    id: link.id.clone(),
                    from: view.apply(from),
                    to: view.apply(to),
                    label: link.label.clone().unwrap_or_default(),
                    label_at: view.apply(mid),
                })
            })
            .collect();

        Scene { nodes, links }
    }
}
