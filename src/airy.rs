//! Linear (Airy) wave transformation with Huygens travel-time refraction.
//!
//! The kernel sits behind [`WavePropagator`] so another front-tracking
//! scheme can be swapped in without touching the rest of the pipeline.

use crate::materials::GRAVITY;
use crate::source::SourceMask;
use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f64::consts::PI;

/// Travel time reported for cells the front never reaches.
pub const UNREACHED: f64 = -1.0;

const DISPERSION_TOL: f64 = 1e-12;
const DISPERSION_MAX_ITER: usize = 50;

// Axial, diagonal and knight moves
const STENCIL: [(isize, isize); 16] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
    (1, 2),
    (2, 1),
    (-1, 2),
    (-2, 1),
    (1, -2),
    (2, -1),
    (-1, -2),
    (-2, -1),
];

/// Everything a front-propagation kernel needs for one scenario.
pub struct PropagationInput<'a> {
    pub dx: f64,
    pub shoal_coeff: f64, // Height attenuation per step in shallow water
    pub h0: f64,          // Boundary wave height (m)
    pub depth: &'a Array2<f64>,
    pub sources: &'a SourceMask,
    pub land: &'a Array2<bool>,
    pub shadow: bool, // Only allow moves that advance along the incident direction
}

/// Raw kernel output before smoothing and breaking.
#[derive(Debug, Clone)]
pub struct PropagationOutput {
    pub celerity: Array2<f64>,
    pub wavelength: Array2<f64>,
    pub travel: Array2<f64>,
    pub height: Array2<f64>,
}

impl PropagationOutput {
    pub fn unreached(shape: (usize, usize)) -> Self {
        PropagationOutput {
            celerity: Array2::zeros(shape),
            wavelength: Array2::zeros(shape),
            travel: Array2::from_elem(shape, UNREACHED),
            height: Array2::zeros(shape),
        }
    }
}

pub trait WavePropagator: Send + Sync {
    fn propagate(&self, input: &PropagationInput) -> PropagationOutput;
}

/// Dispersion relation ω² = g·k·tanh(k·d) solved for k by Newton iteration.
pub fn wavenumber(period: f64, depth: f64) -> f64 {
    if period <= 0.0 || depth <= 0.0 {
        return 0.0;
    }
    let omega2 = (2.0 * PI / period).powi(2);
    // Both deep and shallow limits bound k from below
    let mut k = (omega2 / GRAVITY).max(omega2.sqrt() / (GRAVITY * depth).sqrt());
    for _ in 0..DISPERSION_MAX_ITER {
        let kd = k * depth;
        let tanh = kd.tanh();
        let f = GRAVITY * k * tanh - omega2;
        let df = GRAVITY * tanh + GRAVITY * kd * (1.0 - tanh * tanh);
        let step = f / df;
        k -= step;
        if step.abs() < DISPERSION_TOL * k {
            break;
        }
    }
    k
}

/// Ratio of group to phase celerity, n = ½(1 + 2kd / sinh 2kd).
pub fn group_ratio(k: f64, depth: f64) -> f64 {
    let x = 2.0 * k * depth;
    if x <= 0.0 {
        return 1.0;
    }
    if x > 700.0 {
        return 0.5;
    }
    0.5 * (1.0 + x / x.sinh())
}

#[derive(Debug, Clone, Copy)]
struct FrontEntry {
    time: f64,
    idx: (usize, usize),
}

impl PartialEq for FrontEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.idx == other.idx
    }
}

impl Eq for FrontEntry {}

impl PartialOrd for FrontEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontEntry {
    // Reversed so the max-heap pops the earliest arrival
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .partial_cmp(&self.time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Dijkstra-style Huygens march over a 16-direction stencil.
#[derive(Debug, Clone)]
pub struct HuygensPropagator {
    /// Deep-water period from height: T = period_coeff · √h0
    pub period_coeff: f64,
}

impl Default for HuygensPropagator {
    fn default() -> Self {
        HuygensPropagator { period_coeff: 3.55 }
    }
}

impl HuygensPropagator {
    pub fn new(period_coeff: f64) -> Self {
        HuygensPropagator { period_coeff }
    }

    pub fn period(&self, h0: f64) -> f64 {
        self.period_coeff * h0.max(0.0).sqrt()
    }

    fn passable(input: &PropagationInput, celerity: &Array2<f64>, i: isize, j: isize) -> bool {
        let (nx, ny) = celerity.dim();
        i >= 0
            && j >= 0
            && (i as usize) < nx
            && (j as usize) < ny
            && !input.land[[i as usize, j as usize]]
            && celerity[[i as usize, j as usize]] > 0.0
    }

    /// Cells a long move sweeps past, which must hold water too.
    fn swept(i: isize, j: isize, di: isize, dj: isize) -> [(isize, isize); 2] {
        match (di.abs(), dj.abs()) {
            (1, 1) => [(i + di, j), (i, j + dj)],
            (1, 2) => [(i, j + dj.signum()), (i + di, j + dj.signum())],
            (2, 1) => [(i + di.signum(), j), (i + di.signum(), j + dj)],
            _ => [(i + di, j + dj); 2],
        }
    }
}

impl WavePropagator for HuygensPropagator {
    fn propagate(&self, input: &PropagationInput) -> PropagationOutput {
        let shape = input.depth.dim();
        let mut out = PropagationOutput::unreached(shape);
        let period = self.period(input.h0);
        if input.h0 <= 0.0 || period <= 0.0 {
            return out;
        }

        let l0 = GRAVITY * period * period / (2.0 * PI);
        let cg0 = 0.5 * l0 / period;
        let mut shoaling = Array2::<f64>::zeros(shape);

        for ((i, j), &d) in input.depth.indexed_iter() {
            if input.land[[i, j]] || d <= 0.0 {
                continue;
            }
            let k = wavenumber(period, d);
            let l = 2.0 * PI / k;
            let c = l / period;
            out.wavelength[[i, j]] = l;
            out.celerity[[i, j]] = c;
            shoaling[[i, j]] = (cg0 / (group_ratio(k, d) * c)).sqrt();
        }

        let (px, py) = input.sources.propagation();
        let mut steps = Array2::<u32>::zeros(shape);
        let mut settled = Array2::from_elem(shape, false);
        let mut heap = BinaryHeap::new();

        for (i, j) in input.sources.sources() {
            if out.celerity[[i, j]] > 0.0 {
                out.travel[[i, j]] = 0.0;
                heap.push(FrontEntry {
                    time: 0.0,
                    idx: (i, j),
                });
            }
        }

        while let Some(FrontEntry { time, idx }) = heap.pop() {
            if settled[idx] || time > out.travel[idx] {
                continue;
            }
            settled[idx] = true;
            let (i, j) = (idx.0 as isize, idx.1 as isize);

            for &(di, dj) in STENCIL.iter() {
                let (ni, nj) = (i + di, j + dj);
                if !Self::passable(input, &out.celerity, ni, nj) {
                    continue;
                }
                if Self::swept(i, j, di, dj)
                    .iter()
                    .any(|&(si, sj)| !Self::passable(input, &out.celerity, si, sj))
                {
                    continue;
                }
                if input.shadow && (di as f64 * px + dj as f64 * py) <= 0.0 {
                    continue;
                }
                let n = (ni as usize, nj as usize);
                if settled[n] {
                    continue;
                }

                let dist = input.dx * ((di * di + dj * dj) as f64).sqrt();
                let speed = 0.5 * (out.celerity[idx] + out.celerity[n]);
                let arrival = time + dist / speed;
                if out.travel[n] < 0.0 || arrival < out.travel[n] {
                    out.travel[n] = arrival;
                    steps[n] = steps[idx] + u32::from(input.depth[n] < 0.5 * l0);
                    heap.push(FrontEntry {
                        time: arrival,
                        idx: n,
                    });
                }
            }
        }

        for ((i, j), t) in out.travel.indexed_iter() {
            if *t >= 0.0 {
                out.height[[i, j]] = input.h0
                    * shoaling[[i, j]]
                    * input.shoal_coeff.powi(steps[[i, j]] as i32);
            }
        }
        out
    }
}
