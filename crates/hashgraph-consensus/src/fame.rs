//! Fame decision by virtual voting.
//!
//! For a candidate witness `x` of round `r`, every witness `y` of a later
//! round votes. At distance 1 the vote is whether `y` sees `x`. Further out,
//! `y` tallies the votes of the previous round's witnesses it strongly sees
//! and votes with the majority (ties vote yes). A supermajority on a normal
//! round decides `x`. On coin rounds nothing is decided, and a voter without
//! a supermajority votes its own id's coin bit.
//!
//! Votes are memoized per `(voter, candidate)`. A voter's tally only covers
//! its own ancestors, so once cast a vote never changes.

use hashgraph_core::Fame;
use hashgraph_store::{EventHandle, Store, StoreExt};

use crate::error::Result;
use crate::hashgraph::Hashgraph;

impl<S: Store> Hashgraph<S> {
    /// Try to decide every undecided witness from the decided frontier up.
    ///
    /// Returns the witnesses decided in this pass.
    pub(crate) fn decide_fame(&mut self) -> Result<Vec<EventHandle>> {
        let max_round = self.max_round();
        let mut decided = Vec::new();

        for round in self.next_undecided_round..=max_round {
            for candidate in self.witness_handles(round) {
                if self.store.event(candidate).fame.is_decided() {
                    continue;
                }
                if let Some(fame) = self.vote_on(candidate, round, max_round) {
                    self.store.set_fame(candidate, fame)?;
                    tracing::debug!(
                        witness = %self.store.event(candidate).id,
                        round,
                        ?fame,
                        "fame decided"
                    );
                    decided.push(candidate);
                }
            }
        }

        Ok(decided)
    }

    fn vote_on(&mut self, candidate: EventHandle, round: u64, max_round: u64) -> Option<Fame> {
        for voter_round in round + 1..=max_round {
            let distance = voter_round - round;
            let previous = self.witness_handles(voter_round - 1);

            for voter in self.witness_handles(voter_round) {
                if self.votes.contains_key(&(voter, candidate)) {
                    continue;
                }

                if distance == 1 {
                    let vote = self.relations.see(&self.store, voter, candidate);
                    self.votes.insert((voter, candidate), vote);
                    continue;
                }

                let (yes, no) = self.tally(voter, candidate, &previous);
                let majority_vote = yes >= no;
                let supermajority = self.peers.is_supermajority(yes.max(no));

                let vote = if !self.config.is_coin_round(distance) {
                    if supermajority {
                        return Some(Fame::from_vote(majority_vote));
                    }
                    majority_vote
                } else if supermajority {
                    majority_vote
                } else {
                    self.store.event(voter).id.coin_bit()
                };
                self.votes.insert((voter, candidate), vote);
            }
        }
        None
    }

    /// Count yes and no votes on `candidate` among the `previous` witnesses
    /// that `voter` strongly sees.
    fn tally(
        &mut self,
        voter: EventHandle,
        candidate: EventHandle,
        previous: &[EventHandle],
    ) -> (usize, usize) {
        let mut yes = 0;
        let mut no = 0;
        for &witness in previous {
            if !self
                .relations
                .strongly_see(&self.store, &self.peers, voter, witness)
            {
                continue;
            }
            match self.votes.get(&(witness, candidate)) {
                Some(true) => yes += 1,
                Some(false) => no += 1,
                None => {}
            }
        }
        (yes, no)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use hashgraph_core::{EventId, Fame};

    use hashgraph_store::StoreExt;

    use crate::config::ConsensusConfig;
    use crate::testing::{gossip_lap, gossip_until_round, graph_with_config, peer};

    #[test]
    fn test_fame_decided_behind_the_frontier() {
        let mut graph = graph_with_config(4, ConsensusConfig::default());
        gossip_until_round(&mut graph, 6, 40);
        let delta = graph.run_consensus().unwrap();
        assert!(!delta.decided.is_empty());

        let max_round = graph.max_round();
        for round in 0..=max_round - 3 {
            for witness in graph.witnesses(round) {
                assert!(
                    graph.get(&witness).unwrap().fame.is_decided(),
                    "witness {} of round {} undecided",
                    witness,
                    round
                );
            }
            assert!(!graph.famous_witnesses(round).is_empty());
        }
        assert!(graph.last_decided_round().unwrap() >= max_round - 3);
    }

    #[test]
    fn test_fame_never_reverts() {
        let mut graph = graph_with_config(4, ConsensusConfig::default());
        gossip_until_round(&mut graph, 5, 40);
        graph.run_consensus().unwrap();

        let snapshot: HashMap<EventId, Fame> = (0..=graph.max_round())
            .flat_map(|r| graph.witnesses(r))
            .map(|w| (w, graph.get(&w).unwrap().fame))
            .filter(|(_, fame)| fame.is_decided())
            .collect();
        assert!(!snapshot.is_empty());

        let mut ts = 10_000;
        for _ in 0..5 {
            gossip_lap(&mut graph, &mut ts);
            graph.run_consensus().unwrap();
        }

        for (witness, fame) in snapshot {
            assert_eq!(graph.get(&witness).unwrap().fame, fame);
        }
    }

    #[test]
    fn test_coin_rounds_keep_supermajority_votes() {
        let mut normal = graph_with_config(4, ConsensusConfig::default());
        let mut coin = graph_with_config(
            4,
            ConsensusConfig {
                coin_round_interval: 2,
            },
        );
        gossip_until_round(&mut normal, 7, 40);
        gossip_until_round(&mut coin, 7, 40);
        normal.run_consensus().unwrap();
        coin.run_consensus().unwrap();

        // Same schedule, so the same graph.
        assert_eq!(normal.latest_of(&peer(1)).unwrap(), coin.latest_of(&peer(1)).unwrap());

        for round in 0..=normal.max_round() {
            for witness in normal.witnesses(round) {
                let a = normal.get(&witness).unwrap().fame;
                let b = coin.get(&witness).unwrap().fame;
                if a.is_decided() && b.is_decided() {
                    assert_eq!(a, b, "witness {} of round {}", witness, round);
                }
            }
        }
    }

    #[test]
    fn test_coin_round_without_supermajority_votes_coin_bit() {
        let mut graph = graph_with_config(
            4,
            ConsensusConfig {
                coin_round_interval: 2,
            },
        );
        gossip_until_round(&mut graph, 2, 40);

        // Split the first-round votes on two round 0 witnesses: 2 to 2 on
        // `tied` (majority yes) and 1 to 3 on `leaning` (majority no).
        // Neither reaches the 4 votes a supermajority of 4 needs.
        let round0 = graph.witness_handles(0);
        let round1 = graph.witness_handles(1);
        assert_eq!(round1.len(), 4);
        let (tied, leaning) = (round0[0], round0[1]);
        for (i, voter) in round1.iter().enumerate() {
            graph.votes.insert((*voter, tied), i < 2);
            graph.votes.insert((*voter, leaning), i < 1);
        }

        graph.decide_fame().unwrap();

        // Distance 2 is a coin round. Every round 2 witness strongly sees
        // all four round 1 witnesses, finds no supermajority, and votes its
        // own coin bit on both candidates.
        let round2 = graph.witness_handles(2);
        assert!(!round2.is_empty());
        for voter in round2 {
            let coin = graph.store.event(voter).id.coin_bit();
            assert_eq!(graph.votes.get(&(voter, tied)), Some(&coin));
            assert_eq!(graph.votes.get(&(voter, leaning)), Some(&coin));
        }
    }
}
