use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use super::error::QueryError;
use super::providers::LanguageModel;
use super::result::{MatchResult, parse_match_response};

pub struct QueryReply {
    pub ticket: u64,
    pub query: String,
    pub outcome: Result<MatchResult, QueryError>,
}

/// Fires queries on background threads. Outstanding queries are not
/// cancelled; each reply carries its ticket so the session can drop stale ones.
pub struct QueryRunner {
    tx: Sender<QueryReply>,
    rx: Receiver<QueryReply>,
    next_ticket: u64,
    in_flight: usize,
}

impl Default for QueryRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryRunner {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            next_ticket: 1,
            in_flight: 0,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn submit(&mut self, model: Arc<dyn LanguageModel>, query: String, prompt: String) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight += 1;

        let tx = self.tx.clone();
        log::info!("query #{ticket} sent to {}", model.name());
        thread::spawn(move || {
            let outcome = model
                .generate(&prompt)
                .and_then(|text| parse_match_response(&text));
            let _ = tx.send(QueryReply {
                ticket,
                query,
                outcome,
            });
        });

        ticket
    }

    pub fn poll(&mut self) -> Vec<QueryReply> {
        let replies = self.rx.try_iter().collect::<Vec<_>>();
        self.in_flight = self.in_flight.saturating_sub(replies.len());
        replies
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    struct Canned(&'static str);

    impl LanguageModel for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn generate(&self, _prompt: &str) -> Result<String, QueryError> {
            Ok(self.0.to_owned())
        }
    }

    fn wait_for(runner: &mut QueryRunner, count: usize) -> Vec<QueryReply> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut replies = Vec::new();
        while replies.len() < count && Instant::now() < deadline {
            replies.extend(runner.poll());
            thread::sleep(Duration::from_millis(5));
        }
        replies
    }

    #[test]
    fn test_replies_carry_tickets_and_parse() {
        let mut runner = QueryRunner::new();
        let model: Arc<dyn LanguageModel> = Arc::new(Canned("```json\n{\"matches\":[{\"id\":\"p_0\",\"score\":70}]}\n```"));
        let first = runner.submit(Arc::clone(&model), "a".to_owned(), "prompt".to_owned());
        let second = runner.submit(model, "b".to_owned(), "prompt".to_owned());
        assert!(second > first);

        let mut replies = wait_for(&mut runner, 2);
        replies.sort_by_key(|reply| reply.ticket);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].query, "a");
        assert_eq!(replies[1].ticket, second);
        assert!(replies.iter().all(|reply| reply.outcome.is_ok()));
        assert_eq!(runner.in_flight(), 0);
    }

    #[test]
    fn test_unparseable_reply_is_an_error() {
        let mut runner = QueryRunner::new();
        runner.submit(Arc::new(Canned("no idea")), "q".to_owned(), "prompt".to_owned());
        let replies = wait_for(&mut runner, 1);
        assert!(matches!(replies[0].outcome, Err(QueryError::Parse(_))));
    }
}
