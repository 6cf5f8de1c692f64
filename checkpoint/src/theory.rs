//! Queueing-theory predictions to compare simulation results against.
//!
//! All functions return `None` when the queue is unstable, i.e., the utilization is at least 1,
//! or when the parameters are not positive.

/// Server utilization `ρ = λ E[S]`.
#[must_use]
pub fn utilization(arrival_rate: f64, service_mean: f64) -> f64 {
    arrival_rate * service_mean
}

/// Mean waiting time in an M/G/1 queue given by the Pollaczek–Khinchine formula:
/// `W = λ E[S²] / (2 (1 - ρ))`.
#[must_use]
pub fn mg1_waiting_time(arrival_rate: f64, service_mean: f64, service_variance: f64) -> Option<f64> {
    if !(arrival_rate > 0.0 && service_mean > 0.0 && service_variance >= 0.0) {
        return None;
    }
    let rho = utilization(arrival_rate, service_mean);
    if rho >= 1.0 {
        return None;
    }
    let second_moment = service_variance + service_mean * service_mean;
    Some(arrival_rate * second_moment / (2.0 * (1.0 - rho)))
}

/// Mean waiting time in an M/D/1 queue with a fixed service time.
#[must_use]
pub fn md1_waiting_time(arrival_rate: f64, service_time: f64) -> Option<f64> {
    mg1_waiting_time(arrival_rate, service_time, 0.0)
}

/// Mean waiting time in an M/M/1 queue.
#[must_use]
pub fn mm1_waiting_time(arrival_rate: f64, service_rate: f64) -> Option<f64> {
    if !(service_rate > 0.0) {
        return None;
    }
    mg1_waiting_time(
        arrival_rate,
        1.0 / service_rate,
        1.0 / (service_rate * service_rate),
    )
}

/// Mean waiting time if the Poisson arrival stream was split uniformly at random among
/// `num_servers` independent M/G/1 queues.
///
/// Joining the shortest queue does strictly better, so this serves as an upper reference for
/// the simulated checkpoint.
#[must_use]
pub fn split_mg1_waiting_time(
    arrival_rate: f64,
    num_servers: usize,
    service_mean: f64,
    service_variance: f64,
) -> Option<f64> {
    if num_servers == 0 {
        return None;
    }
    mg1_waiting_time(
        arrival_rate / num_servers as f64,
        service_mean,
        service_variance,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_md1() {
        assert_eq!(md1_waiting_time(0.5, 1.0), Some(0.5));
        assert!(approx_eq!(
            f64,
            md1_waiting_time(0.8, 1.0).unwrap(),
            2.0,
            epsilon = 1e-12
        ));
    }

    #[test]
    fn test_mm1_is_twice_md1() {
        assert!(approx_eq!(
            f64,
            mm1_waiting_time(0.5, 1.0).unwrap(),
            1.0,
            epsilon = 1e-12
        ));
        assert!(approx_eq!(
            f64,
            mm1_waiting_time(0.5, 1.0).unwrap(),
            2.0 * md1_waiting_time(0.5, 1.0).unwrap(),
            epsilon = 1e-12
        ));
    }

    #[test]
    fn test_unstable_or_invalid() {
        assert_eq!(md1_waiting_time(1.2, 1.0), None);
        assert_eq!(md1_waiting_time(1.0, 1.0), None);
        assert_eq!(mg1_waiting_time(0.0, 1.0, 1.0), None);
        assert_eq!(mg1_waiting_time(0.5, 1.0, -1.0), None);
        assert_eq!(mm1_waiting_time(0.5, 0.0), None);
        assert_eq!(split_mg1_waiting_time(1.2, 0, 1.0, 0.0), None);
    }

    #[test]
    fn test_split_stabilizes_overloaded_single_queue() {
        assert_eq!(split_mg1_waiting_time(1.2, 1, 1.0, 0.0), None);
        assert!(approx_eq!(
            f64,
            split_mg1_waiting_time(1.2, 2, 1.0, 0.0).unwrap(),
            md1_waiting_time(0.6, 1.0).unwrap(),
            ulps = 2
        ));
    }
}
