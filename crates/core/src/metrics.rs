use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pricing::PricingRate;

pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub agent_response: String,
    pub latency_ms: u64,
    pub feedback: Option<Feedback>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_queries: usize,
    pub avg_latency_seconds: f64,
    pub positive_feedback_rate: f64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_cost_per_query: f64,
}

pub fn default_window() -> Duration {
    Duration::days(DEFAULT_WINDOW_DAYS)
}

pub fn aggregate(
    events: &[AgentEvent],
    window_end: DateTime<Utc>,
    window: Duration,
    pricing: &PricingRate,
) -> MetricsSummary {
    let cutoff = window_end - window;
    let recent: Vec<&AgentEvent> = events.iter().filter(|e| e.timestamp >= cutoff).collect();
    let total_queries = recent.len();
    let latency_sum: u64 = recent.iter().map(|e| e.latency_ms).sum();
    let positive = recent
        .iter()
        .filter(|e| e.feedback == Some(Feedback::Positive))
        .count();
    let with_feedback = recent.iter().filter(|e| e.feedback.is_some()).count();
    let input_tokens: u64 = recent.iter().map(|e| e.input_tokens).sum();
    let output_tokens: u64 = recent.iter().map(|e| e.output_tokens).sum();
    let total_cost = pricing.cost(input_tokens, output_tokens);
    MetricsSummary {
        total_queries,
        avg_latency_seconds: ratio(latency_sum as f64, total_queries) / 1000.0,
        positive_feedback_rate: ratio(positive as f64, with_feedback) * 100.0,
        total_tokens: input_tokens + output_tokens,
        total_cost,
        avg_cost_per_query: ratio(total_cost, total_queries),
    }
}

fn ratio(numerator: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        numerator / count as f64
    }
}

pub fn synthetic_events<R: Rng>(count: usize, now: DateTime<Utc>, rng: &mut R) -> Vec<AgentEvent> {
    let mut events: Vec<AgentEvent> = (1..=count)
        .map(|idx| {
            let age = Duration::days(rng.gen_range(0..=6)) + Duration::hours(rng.gen_range(0..=23));
            let feedback = match rng.gen_range(0..10) {
                0..=6 => Some(Feedback::Positive),
                7 | 8 => Some(Feedback::Negative),
                _ => None,
            };
            AgentEvent {
                timestamp: now - age,
                user_message: format!("Sample user query #{idx}"),
                agent_response: format!("Sample agent response #{idx}"),
                latency_ms: rng.gen_range(800..=7500),
                feedback,
                input_tokens: rng.gen_range(1500..=4500),
                output_tokens: rng.gen_range(50..=300),
                status: "SUCCESS".to_string(),
            }
        })
        .collect();
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyVolume {
    pub day: NaiveDate,
    pub label: String,
    pub count: usize,
}

pub fn daily_volume(events: &[AgentEvent]) -> Vec<DailyVolume> {
    let days: Vec<NaiveDate> = events.iter().map(|e| e.timestamp.date_naive()).collect();
    let (Some(first), Some(last)) = (days.iter().min().copied(), days.iter().max().copied())
    else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| DailyVolume {
            day,
            label: day.format("%b %d").to_string(),
            count: days.iter().filter(|d| **d == day).count(),
        })
        .collect()
}

pub fn recent_interactions(events: &[AgentEvent], limit: usize) -> Vec<AgentEvent> {
    let mut sorted = events.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted.truncate(limit);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn event(at: DateTime<Utc>, latency_ms: u64, feedback: Option<Feedback>) -> AgentEvent {
        AgentEvent {
            timestamp: at,
            user_message: "q".into(),
            agent_response: "a".into(),
            latency_ms,
            feedback,
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
            status: "SUCCESS".into(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_window_yields_zeroes() {
        let summary = aggregate(&[], now(), default_window(), &PricingRate::default());
        assert_eq!(summary, MetricsSummary::default());
        assert!(!summary.avg_latency_seconds.is_nan());
    }

    #[test]
    fn million_tokens_cost_one_fifty() {
        let events = vec![event(now(), 1200, Some(Feedback::Positive))];
        let summary = aggregate(&events, now(), default_window(), &PricingRate::default());
        assert_eq!(summary.total_queries, 1);
        assert!((summary.total_cost - 1.50).abs() < 1e-12);
        assert!((summary.avg_cost_per_query - 1.50).abs() < 1e-12);
        assert_eq!(summary.total_tokens, 2_000_000);
        assert!((summary.avg_latency_seconds - 1.2).abs() < 1e-12);
    }

    #[test]
    fn feedback_rate_ignores_events_without_feedback() {
        let events = vec![
            event(now(), 1000, Some(Feedback::Positive)),
            event(now(), 1000, Some(Feedback::Negative)),
            event(now(), 1000, None),
            event(now(), 1000, Some(Feedback::Positive)),
        ];
        let summary = aggregate(&events, now(), default_window(), &PricingRate::default());
        assert!((summary.positive_feedback_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn events_outside_window_are_dropped() {
        let events = vec![
            event(now() - Duration::days(8), 5000, Some(Feedback::Negative)),
            event(now() - Duration::days(7), 1000, Some(Feedback::Positive)),
        ];
        let summary = aggregate(&events, now(), default_window(), &PricingRate::default());
        assert_eq!(summary.total_queries, 1);
        assert_eq!(summary.positive_feedback_rate, 100.0);
    }

    #[test]
    fn synthetic_log_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let events = synthetic_events(100, now(), &mut rng);
        assert_eq!(events.len(), 100);
        assert!(events.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        for e in &events {
            assert!(e.timestamp <= now() && e.timestamp > now() - default_window());
            assert!((800..=7500).contains(&e.latency_ms));
            assert!((1500..=4500).contains(&e.input_tokens));
            assert!((50..=300).contains(&e.output_tokens));
        }
        let summary = aggregate(&events, now(), default_window(), &PricingRate::default());
        assert_eq!(summary.total_queries, 100);
    }

    #[test]
    fn daily_volume_fills_gaps() {
        let events = vec![
            event(now(), 1, None),
            event(now(), 1, None),
            event(now() - Duration::days(2), 1, None),
        ];
        let volume = daily_volume(&events);
        let counts: Vec<usize> = volume.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![1, 0, 2]);
        assert_eq!(volume[2].label, "May 10");
    }

    #[test]
    fn recent_interactions_are_newest_first() {
        let events = vec![
            event(now() - Duration::hours(3), 3, None),
            event(now(), 1, None),
            event(now() - Duration::hours(1), 2, None),
        ];
        let recent = recent_interactions(&events, 2);
        let latencies: Vec<u64> = recent.iter().map(|e| e.latency_ms).collect();
        assert_eq!(latencies, vec![1, 2]);
    }
}
