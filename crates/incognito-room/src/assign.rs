//! Name distribution for the start of a game.
//!
//! Every player draws an identity label from the pool, and nobody may
//! draw a label equal to their own display name. A plain shuffle gets a
//! local repair pass; if any fixed point survives the repair, the whole
//! draw is redone from a fresh shuffle.

use rand::seq::SliceRandom;

/// Draws one pool label per player such that no player receives a label
/// equal to their own name.
///
/// The caller guarantees `players.len() >= 2` and
/// `pool.len() >= players.len()`; surplus pool labels go unassigned.
/// Returned labels are in player order.
pub fn distribute(players: &[&str], pool: &[String]) -> Vec<String> {
    debug_assert!(players.len() >= 2);
    debug_assert!(pool.len() >= players.len());

    let mut rng = rand::rng();
    loop {
        let mut candidates: Vec<String> = pool.to_vec();
        candidates.shuffle(&mut rng);
        repair(players, &mut candidates);

        let clean = players
            .iter()
            .zip(&candidates)
            .all(|(player, label)| *player != label.as_str());
        if clean {
            candidates.truncate(players.len());
            return candidates;
        }
    }
}

/// Local repair: a slot whose label matches its player swaps with the
/// neighboring slot (the previous one when there is no next).
///
/// This fixes isolated collisions cheaply but can reintroduce one when
/// two collisions are adjacent, hence the verification in [`distribute`].
fn repair(players: &[&str], candidates: &mut [String]) {
    for i in 0..players.len() {
        if candidates[i] == players[i] {
            let swap = if i + 1 < candidates.len() { i + 1 } else { i - 1 };
            candidates.swap(i, swap);
        }
    }
}
