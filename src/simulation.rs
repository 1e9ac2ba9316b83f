//! Process simulation for the controlled station.
//!
//! Each step reads the command values left by the previous tick and
//! produces the measurements for the current one. With control on, the
//! temperature follows the setpoint by exponential smoothing; with control
//! off it hovers around a fixed baseline. Pressure is pure jitter and the
//! status is a coin flip.

use rand::Rng;

/// Tuning of the simulated process.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    /// Temperature with control off
    pub baseline: f32,
    /// Jitter bound around the baseline
    pub baseline_jitter: f32,
    /// Fraction of the remaining distance covered per tick
    pub smoothing: f32,
    /// Jitter bound while tracking the setpoint
    pub tracking_jitter: f32,
    /// Distance under which the temperature snaps onto the setpoint
    pub snap_threshold: f32,
    /// Pressure centre
    pub pressure: f32,
    /// Jitter bound around the pressure centre
    pub pressure_jitter: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            baseline: 25.0,
            baseline_jitter: 1.0,
            smoothing: 0.1,
            tracking_jitter: 0.1,
            snap_threshold: 0.1,
            pressure: 100.0,
            pressure_jitter: 5.0,
        }
    }
}

/// Command values and current measurement fed into a step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimulationInputs {
    /// Control switch, `false` when never written
    pub control: bool,
    /// Setpoint, 0.0 when never written
    pub setpoint: f32,
    /// Temperature reported on the previous tick
    pub temperature: Option<f32>,
}

/// Measurements produced by a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationOutputs {
    /// Primary measurement, tracks the setpoint under control
    pub temperature: f32,
    /// Secondary measurement, jitter only
    pub pressure: f32,
    /// Status flag
    pub status: bool,
}

/// Simulated process driven by a random source.
#[derive(Debug)]
pub struct Simulation<R: Rng> {
    params: SimulationParams,
    rng: R,
}

impl<R: Rng> Simulation<R> {
    /// Create a simulation with default tuning.
    pub fn new(rng: R) -> Self {
        Self::with_params(SimulationParams::default(), rng)
    }

    /// Create a simulation with explicit tuning.
    pub fn with_params(params: SimulationParams, rng: R) -> Self {
        Self { params, rng }
    }

    /// Tuning in use.
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Advance the process by one tick.
    pub fn step(&mut self, inputs: SimulationInputs) -> SimulationOutputs {
        let temperature = self.next_temperature(inputs);
        let pressure = self.params.pressure + self.jitter(self.params.pressure_jitter);
        let status = self.rng.gen_bool(0.5);
        SimulationOutputs {
            temperature,
            pressure,
            status,
        }
    }

    fn next_temperature(&mut self, inputs: SimulationInputs) -> f32 {
        let p = &self.params;
        if !inputs.control {
            let baseline = p.baseline;
            let bound = p.baseline_jitter;
            return baseline + self.jitter(bound);
        }

        let target = inputs.setpoint;
        let current = inputs.temperature.unwrap_or(p.baseline);
        let next = if (current - target).abs() > p.snap_threshold {
            current + (target - current) * p.smoothing
        } else {
            target
        };
        let bound = p.tracking_jitter;
        next + self.jitter(bound)
    }

    fn jitter(&mut self, bound: f32) -> f32 {
        if bound <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-bound..=bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn simulation(seed: u64) -> Simulation<StdRng> {
        Simulation::new(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_control_off_stays_near_baseline() {
        for seed in 0..5 {
            let mut sim = simulation(seed);
            let mut inputs = SimulationInputs::default();
            for _ in 0..100 {
                let out = sim.step(inputs);
                assert!(
                    (23.9..=26.1).contains(&out.temperature),
                    "temperature {} left the baseline band",
                    out.temperature
                );
                inputs.temperature = Some(out.temperature);
            }
        }
    }

    #[test]
    fn test_control_off_returns_to_baseline_from_setpoint() {
        let mut sim = simulation(7);
        let out = sim.step(SimulationInputs {
            control: false,
            setpoint: 50.0,
            temperature: Some(49.8),
        });
        assert!((24.0..=26.0).contains(&out.temperature));
    }

    #[test]
    fn test_control_on_converges_to_setpoint() {
        let mut sim = simulation(42);
        let tolerance = sim.params().tracking_jitter + 1e-4;
        let mut inputs = SimulationInputs {
            control: true,
            setpoint: 50.0,
            temperature: Some(25.0),
        };
        let mut distance = 25.0_f32;
        let mut reached_at = None;

        for tick in 1..=60 {
            let out = sim.step(inputs);
            let next = (out.temperature - 50.0).abs();
            assert!(
                next <= distance * 0.9 + tolerance,
                "tick {}: distance {} after {}",
                tick,
                next,
                distance
            );
            if next <= 1.0 && reached_at.is_none() {
                reached_at = Some(tick);
            }
            distance = next;
            inputs.temperature = Some(out.temperature);
        }

        let reached_at = reached_at.expect("setpoint never reached");
        assert!(reached_at <= 60, "reached only at tick {}", reached_at);
        assert!(distance <= 1.0);
    }

    #[test]
    fn test_control_on_without_previous_value_starts_at_baseline() {
        let mut sim = Simulation::with_params(
            SimulationParams {
                tracking_jitter: 0.0,
                ..SimulationParams::default()
            },
            StdRng::seed_from_u64(1),
        );
        let out = sim.step(SimulationInputs {
            control: true,
            setpoint: 35.0,
            temperature: None,
        });
        assert!((out.temperature - 26.0).abs() < 1e-4);
    }

    #[test]
    fn test_snaps_onto_setpoint_when_close() {
        let mut sim = Simulation::with_params(
            SimulationParams {
                tracking_jitter: 0.0,
                ..SimulationParams::default()
            },
            StdRng::seed_from_u64(3),
        );
        let out = sim.step(SimulationInputs {
            control: true,
            setpoint: 50.0,
            temperature: Some(49.95),
        });
        assert_eq!(out.temperature, 50.0);
    }

    #[test]
    fn test_pressure_and_status_bounds() {
        let mut sim = simulation(9);
        let mut seen_true = false;
        let mut seen_false = false;
        for _ in 0..200 {
            let out = sim.step(SimulationInputs::default());
            assert!((95.0..=105.0).contains(&out.pressure));
            if out.status {
                seen_true = true;
            } else {
                seen_false = true;
            }
        }
        assert!(seen_true && seen_false);
    }
}
