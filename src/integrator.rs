use crate::params::IntegrationMethod;

/// Explicit fixed-step integrator. Stage buffers are allocated once per run and reused for every
/// step.
#[derive(Debug, Clone)]
pub struct Integrator {
    method: IntegrationMethod,
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    stage: Vec<f64>,
}

impl Integrator {
    pub fn new(method: IntegrationMethod, state_len: usize) -> Self {
        let num_stages = match method {
            IntegrationMethod::Euler => 1,
            IntegrationMethod::RungeKutta4 => 4,
        };

        let stage_buffer = |stage_id: usize| {
            if stage_id < num_stages {
                vec![0.0; state_len]
            } else {
                Vec::new()
            }
        };

        Self {
            method,
            k1: stage_buffer(0),
            k2: stage_buffer(1),
            k3: stage_buffer(2),
            k4: stage_buffer(3),
            stage: if num_stages > 1 {
                vec![0.0; state_len]
            } else {
                Vec::new()
            },
        }
    }

    pub fn method(&self) -> IntegrationMethod {
        self.method
    }

    /// Advances `state` at time `t` by `dt` and writes the result to `next_state`.
    ///
    /// `derivative(t, state, d_state)` must overwrite every entry of `d_state`.
    pub fn step<F>(
        &mut self,
        t: f64,
        dt: f64,
        state: &[f64],
        next_state: &mut [f64],
        mut derivative: F,
    ) where
        F: FnMut(f64, &[f64], &mut [f64]),
    {
        match self.method {
            IntegrationMethod::Euler => {
                derivative(t, state, &mut self.k1);

                for ((next, y), k1) in next_state.iter_mut().zip(state).zip(&self.k1) {
                    *next = y + dt * k1;
                }
            }
            IntegrationMethod::RungeKutta4 => {
                let half_dt = 0.5 * dt;

                derivative(t, state, &mut self.k1);
                advance(state, &self.k1, half_dt, &mut self.stage);

                derivative(t + half_dt, &self.stage, &mut self.k2);
                advance(state, &self.k2, half_dt, &mut self.stage);

                derivative(t + half_dt, &self.stage, &mut self.k3);
                advance(state, &self.k3, dt, &mut self.stage);

                derivative(t + dt, &self.stage, &mut self.k4);

                for (i, next) in next_state.iter_mut().enumerate() {
                    *next = state[i]
                        + dt / 6.0 * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
                }
            }
        }
    }
}

fn advance(state: &[f64], slope: &[f64], h: f64, out: &mut [f64]) {
    for ((out, y), k) in out.iter_mut().zip(state).zip(slope) {
        *out = y + h * k;
    }
}
