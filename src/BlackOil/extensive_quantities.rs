use super::biofilm_quantities::BiofilmExtensiveQuantities;
use super::element_context::ElementContext;
use super::errors::BlackOilError;
use super::fluid_system::NUM_PHASES;
use crate::Numerics::evaluation::{Evaluation, constant, value_only};

/// Reduces a potential difference by the threshold pressure of the connection:
/// `|d| > t` gives `d - sign(d) t`, anything smaller gives exactly zero.
pub fn apply_threshold_pressure(diff: Evaluation, thpres: f64) -> Evaluation {
    if diff.re.abs() > thpres {
        if diff.re < 0.0 { diff + thpres } else { diff - thpres }
    } else {
        constant(0.0)
    }
}

/// Local (upstream, downstream) indices for a potential difference `exterior - interior`.
///
/// Without a gradient the face is ordered by global cell index, the smaller one upstream.
/// The local dof order is deliberately not used for this: the focus cell is local dof 0
/// in its own stencil, so a local ordering would pick a different upstream cell from
/// each side of the same face.
pub fn upstream_downstream(
    diff: f64,
    interior: usize,
    exterior: usize,
    global_interior: usize,
    global_exterior: usize,
) -> (usize, usize) {
    if diff > 0.0 {
        (exterior, interior)
    } else if diff < 0.0 {
        (interior, exterior)
    } else if global_interior <= global_exterior {
        (interior, exterior)
    } else {
        (exterior, interior)
    }
}

/// Phase volume fluxes across one face of the focus cell, positive out of the interior.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensiveQuantities<const B: bool> {
    interior_index: usize,
    exterior_index: usize,
    upstream_index: [usize; NUM_PHASES],
    downstream_index: [usize; NUM_PHASES],
    volume_flux: [Evaluation; NUM_PHASES],
    pub biofilm: BiofilmExtensiveQuantities<B>,
}

impl<const B: bool> Default for ExtensiveQuantities<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const B: bool> ExtensiveQuantities<B> {
    pub fn new() -> Self {
        Self {
            interior_index: 0,
            exterior_index: 0,
            upstream_index: [0; NUM_PHASES],
            downstream_index: [0; NUM_PHASES],
            volume_flux: [constant(0.0); NUM_PHASES],
            biofilm: BiofilmExtensiveQuantities::default(),
        }
    }

    pub fn update(&mut self, ctx: &ElementContext<B>, face: usize, time_idx: usize) -> Result<(), BlackOilError> {
        let stencil_face = *ctx.interior_face(face);
        let interior = stencil_face.interior_index;
        let exterior = stencil_face.exterior_index;
        self.interior_index = interior;
        self.exterior_index = exterior;

        let problem = ctx.problem();
        let global_in = ctx.global_space_index(interior);
        let global_ex = ctx.global_space_index(exterior);
        let thpres = problem.threshold_pressure(global_in, global_ex);
        let trans = problem.transmissibility(global_in, global_ex);
        let face_area = problem.face_area(global_in, global_ex);
        let g = problem.gravity();
        let dist_z = problem.dof_center_depth(global_in) - problem.dof_center_depth(global_ex);

        let iq_in = ctx.intensive_quantities(interior, time_idx);
        let iq_ex = ctx.intensive_quantities(exterior, time_idx);
        for phase_idx in 0..NUM_PHASES {
            if !ctx.fluid_system().phase_is_active(phase_idx) {
                self.volume_flux[phase_idx] = constant(0.0);
                self.upstream_index[phase_idx] = interior;
                self.downstream_index[phase_idx] = exterior;
                continue;
            }
            let rho_avg = iq_in.fluid_state.density[phase_idx] * 0.5
                + iq_ex.fluid_state.density[phase_idx].re * 0.5;
            let p_in = iq_in.fluid_state.pressure[phase_idx];
            let p_ex = value_only(&iq_ex.fluid_state.pressure[phase_idx]) + rho_avg * (dist_z * g);
            let diff = apply_threshold_pressure(p_ex - p_in, thpres);

            let (up, down) = upstream_downstream(diff.re, interior, exterior, global_in, global_ex);
            self.upstream_index[phase_idx] = up;
            self.downstream_index[phase_idx] = down;
            if diff.re == 0.0 {
                self.volume_flux[phase_idx] = constant(0.0);
                continue;
            }
            let mobility = ctx.intensive_quantities(up, time_idx).mobility[phase_idx];
            let mobility = if up == interior { mobility } else { value_only(&mobility) };
            self.volume_flux[phase_idx] = mobility * diff * (-trans / face_area);
        }

        self.biofilm.update_flux_trans(ctx, face, time_idx)
    }

    pub fn interior_index(&self) -> usize {
        self.interior_index
    }

    pub fn exterior_index(&self) -> usize {
        self.exterior_index
    }

    pub fn upstream_index(&self, phase_idx: usize) -> usize {
        self.upstream_index[phase_idx]
    }

    pub fn downstream_index(&self, phase_idx: usize) -> usize {
        self.downstream_index[phase_idx]
    }

    /// m^3 / (m^2 s)
    pub fn volume_flux(&self, phase_idx: usize) -> &Evaluation {
        &self.volume_flux[phase_idx]
    }
}
