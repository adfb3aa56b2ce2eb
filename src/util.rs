use std::ops::Range;

/// Contiguous share of `num_items` assigned to `thread_id`. Partition sizes differ by at most one.
pub fn get_partition_range(
    num_threads: usize,
    thread_id: usize,
    num_items: usize,
) -> Range<usize> {
    let min_partition_size = num_items / num_threads;
    let remainder = num_items % num_threads;

    if thread_id < remainder {
        let partition_size = min_partition_size + 1;
        let start = partition_size * thread_id;
        let end = start + partition_size;
        Range { start, end }
    } else {
        let start =
            (min_partition_size + 1) * remainder + min_partition_size * (thread_id - remainder);
        let end = start + min_partition_size;
        Range { start, end }
    }
}

#[cfg(test)]
pub mod test_util {
    use crate::params::{
        BoltzmannChannelParams, BoltzmannGateParams, ChannelKind, ChannelParams, NetworkParams,
        NeuronParams, RunParams, SimulationParams, SynapseKind,
    };
    use float_cmp::{assert_approx_eq, ApproxEq};
    use std::fmt::Debug;

    pub fn assert_approx_eq_slice<T>(left: &[T], right: &[T])
    where
        T: ApproxEq + Debug + Copy,
    {
        assert_eq!(left.len(), right.len());

        for item in left.iter().zip(right) {
            assert_approx_eq!(T, *item.0, *item.1);
        }
    }

    /// Three default neurons in an inhibitory ring.
    pub fn get_template_network_params() -> NetworkParams {
        let mut params = NetworkParams::default();

        for _ in 0..3 {
            params.add_neuron(NeuronParams::default());
        }

        params.connect(0, 1, SynapseKind::inhibitory(0.2));
        params.connect(1, 2, SynapseKind::inhibitory(0.2));
        params.connect(2, 0, SynapseKind::inhibitory(0.2));
        params
    }

    pub fn get_template_simulation_params() -> SimulationParams {
        SimulationParams {
            network: get_template_network_params(),
            run: RunParams {
                duration: 100.0,
                dt: 0.025,
                ..RunParams::default()
            },
        }
    }

    /// A-type potassium current with Boltzmann gates.
    pub fn get_template_boltzmann_channel() -> ChannelParams {
        ChannelParams {
            kind: ChannelKind::Boltzmann(BoltzmannChannelParams {
                activation: BoltzmannGateParams {
                    half_activation_voltage: -40.0,
                    slope: -6.0,
                    tau: 5.0,
                },
                inactivation: Some(BoltzmannGateParams {
                    half_activation_voltage: -60.0,
                    slope: 6.0,
                    tau: 50.0,
                }),
                activation_exponent: 3,
                carries_calcium: false,
            }),
            conductance: 10.0,
            reversal_potential: Some(-80.0),
            tau_scale: 1.0,
        }
    }
}
