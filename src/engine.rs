use std::fmt;

use crate::cards::{Card, DECK_SIZE};

/// Number of rows/columns in the play grid.
pub const SIZE: usize = 5;
/// Number of cells in the play grid.
pub const CELLS: usize = SIZE * SIZE;

/// Invariant violations local to the engine.
///
/// None of these are expected under correct driver usage; they abort the
/// call and are not retried.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("cell ({row}, {col}) is already occupied")]
    CellOccupied { row: usize, col: usize },
    #[error("card {0} is not in the remaining deck")]
    CardNotAvailable(Card),
    #[error("no empty cells available")]
    NoEmptyCells,
}

/// The 5x5 play grid of optional card slots.
///
/// Cloning is a deep value copy; two clones never observe each other's
/// placements.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[Option<Card>; SIZE]; SIZE],
    filled: usize,
}

impl Grid {
    /// A constant empty grid.
    pub const EMPTY: Grid = Grid { cells: [[None; SIZE]; SIZE], filled: 0 };

    pub fn new() -> Self {
        Self::EMPTY
    }

    /// The card at `(row, col)`, if any.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Card> {
        self.cells[row][col]
    }

    /// True if `(row, col)` holds no card.
    #[inline]
    pub fn is_empty(&self, row: usize, col: usize) -> bool {
        self.cells[row][col].is_none()
    }

    /// Number of occupied cells.
    #[inline]
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// True once all 25 cells are occupied (terminal game state).
    #[inline]
    pub fn is_full(&self) -> bool {
        self.filled == CELLS
    }

    /// Fill `(row, col)` with `card`.
    ///
    /// Fails with [`EngineError::CellOccupied`] on a non-empty cell. Card
    /// uniqueness is the caller's responsibility, enforced by deck
    /// semantics.
    ///
    /// ```
    /// use ai_squares::cards::Card;
    /// use ai_squares::engine::Grid;
    /// let mut grid = Grid::new();
    /// grid.place(2, 3, Card::from(0)).unwrap();
    /// assert!(grid.place(2, 3, Card::from(1)).is_err());
    /// ```
    pub fn place(&mut self, row: usize, col: usize, card: Card) -> Result<(), EngineError> {
        if self.cells[row][col].is_some() {
            return Err(EngineError::CellOccupied { row, col });
        }
        self.cells[row][col] = Some(card);
        self.filled += 1;
        Ok(())
    }

    /// Clear `(row, col)`, returning the removed card.
    ///
    /// Only used to undo a speculative placement inside search, never on
    /// committed state.
    pub fn remove(&mut self, row: usize, col: usize) -> Option<Card> {
        let card = self.cells[row][col].take();
        if card.is_some() {
            self.filled -= 1;
        }
        card
    }

    /// Empty cells in row-major order — the deterministic tie-break basis.
    ///
    /// ```
    /// use ai_squares::engine::Grid;
    /// let grid = Grid::new();
    /// assert_eq!(grid.empty_cells().next(), Some((0, 0)));
    /// assert_eq!(grid.empty_cells().count(), 25);
    /// ```
    pub fn empty_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..SIZE)
            .flat_map(|row| (0..SIZE).map(move |col| (row, col)))
            .filter(move |&(row, col)| self.cells[row][col].is_none())
    }

    /// First empty cell in row-major order.
    #[inline]
    pub fn first_empty(&self) -> Option<(usize, usize)> {
        self.empty_cells().next()
    }

    /// The cards of row `row`, left to right.
    #[inline]
    pub fn row(&self, row: usize) -> [Option<Card>; SIZE] {
        self.cells[row]
    }

    /// The cards of column `col`, top to bottom.
    #[inline]
    pub fn col(&self, col: usize) -> [Option<Card>; SIZE] {
        let mut out = [None; SIZE];
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = self.cells[row][col];
        }
        out
    }

    /// The ten scorable hands: 5 rows, then 5 columns.
    pub fn hands(&self) -> impl Iterator<Item = [Option<Card>; SIZE]> + '_ {
        (0..SIZE).map(|r| self.row(r)).chain((0..SIZE).map(|c| self.col(c)))
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid(filled={})", self.filled)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..SIZE {
            for col in 0..SIZE {
                match self.cells[row][col] {
                    Some(card) => write!(f, " {}", card)?,
                    None => write!(f, " __")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// The set of cards not yet drawn by the game.
///
/// Backed by a membership bitmap over the 52 card indices: O(1) draw and
/// membership, deterministic index-order enumeration. Cloning has the same
/// non-aliasing guarantee as [`Grid`].
#[derive(Clone, PartialEq, Eq)]
pub struct Deck {
    present: [bool; DECK_SIZE],
    len: usize,
}

impl Deck {
    /// A full 52-card deck.
    pub fn full() -> Self {
        Deck { present: [true; DECK_SIZE], len: DECK_SIZE }
    }

    /// Number of cards remaining.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if `card` has not been drawn yet.
    #[inline]
    pub fn contains(&self, card: Card) -> bool {
        self.present[u8::from(card) as usize]
    }

    /// Remove `card` from the remaining set.
    ///
    /// Called once per turn, at the moment the card is revealed — before
    /// the search runs, so the just-drawn card is excluded from the deck
    /// the search reasons about for future draws. Fails with
    /// [`EngineError::CardNotAvailable`] if the card was already drawn.
    pub fn draw(&mut self, card: Card) -> Result<(), EngineError> {
        let idx = u8::from(card) as usize;
        if !self.present[idx] {
            return Err(EngineError::CardNotAvailable(card));
        }
        self.present[idx] = false;
        self.len -= 1;
        Ok(())
    }

    /// A copy of this deck with `card` removed.
    ///
    /// Used by chance-node expansion to exclude cards already accounted
    /// for at ancestor plies.
    #[inline]
    pub fn without(&self, card: Card) -> Deck {
        let mut out = self.clone();
        let idx = u8::from(card) as usize;
        debug_assert!(out.present[idx]);
        if out.present[idx] {
            out.present[idx] = false;
            out.len -= 1;
        }
        out
    }

    /// Remaining cards in deck-index order.
    pub fn remaining(&self) -> impl Iterator<Item = Card> + '_ {
        self.present
            .iter()
            .enumerate()
            .filter(|(_, &p)| p)
            .map(|(i, _)| Card::from(i as u8))
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::full()
    }
}

impl fmt::Debug for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deck({} remaining)", self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Rank, Suit};

    fn card(n: u8) -> Card {
        Card::from(n)
    }

    #[test]
    fn place_and_remove() {
        let mut grid = Grid::new();
        assert!(grid.is_empty(1, 1));
        grid.place(1, 1, card(0)).unwrap();
        assert_eq!(grid.filled(), 1);
        assert_eq!(grid.get(1, 1), Some(card(0)));
        assert_eq!(grid.remove(1, 1), Some(card(0)));
        assert_eq!(grid.filled(), 0);
        assert_eq!(grid.remove(1, 1), None);
    }

    #[test]
    fn place_occupied_fails() {
        let mut grid = Grid::new();
        grid.place(0, 0, card(0)).unwrap();
        assert_eq!(
            grid.place(0, 0, card(1)),
            Err(EngineError::CellOccupied { row: 0, col: 0 })
        );
        assert_eq!(grid.filled(), 1);
    }

    #[test]
    fn empty_cells_row_major() {
        let mut grid = Grid::new();
        grid.place(0, 0, card(0)).unwrap();
        grid.place(0, 2, card(1)).unwrap();
        let cells: Vec<_> = grid.empty_cells().take(3).collect();
        assert_eq!(cells, vec![(0, 1), (0, 3), (0, 4)]);
        assert_eq!(grid.empty_cells().count(), CELLS - 2);
    }

    #[test]
    fn full_after_25() {
        let mut grid = Grid::new();
        for (i, (row, col)) in (0..SIZE)
            .flat_map(|r| (0..SIZE).map(move |c| (r, c)))
            .enumerate()
        {
            assert!(!grid.is_full());
            grid.place(row, col, card(i as u8)).unwrap();
        }
        assert!(grid.is_full());
        assert_eq!(grid.first_empty(), None);
    }

    #[test]
    fn clones_do_not_alias() {
        let mut grid = Grid::new();
        grid.place(2, 2, card(7)).unwrap();
        let mut copy = grid.clone();
        copy.place(3, 3, card(8)).unwrap();
        copy.remove(2, 2);
        assert_eq!(grid.get(2, 2), Some(card(7)));
        assert!(grid.is_empty(3, 3));
        assert_eq!(grid.filled(), 1);
        assert_eq!(copy.filled(), 1);
    }

    #[test]
    fn rows_cols_and_hands() {
        let mut grid = Grid::new();
        let c = Card::new(Rank::Ace, Suit::Spades);
        grid.place(1, 3, c).unwrap();
        assert_eq!(grid.row(1)[3], Some(c));
        assert_eq!(grid.col(3)[1], Some(c));
        assert_eq!(grid.hands().count(), 2 * SIZE);
    }

    #[test]
    fn deck_draw() {
        let mut deck = Deck::full();
        assert_eq!(deck.len(), DECK_SIZE);
        let c = card(17);
        assert!(deck.contains(c));
        deck.draw(c).unwrap();
        assert!(!deck.contains(c));
        assert_eq!(deck.len(), DECK_SIZE - 1);
        assert_eq!(deck.draw(c), Err(EngineError::CardNotAvailable(c)));
    }

    #[test]
    fn deck_remaining_index_order() {
        let mut deck = Deck::full();
        deck.draw(card(0)).unwrap();
        deck.draw(card(2)).unwrap();
        let head: Vec<u8> = deck.remaining().take(3).map(u8::from).collect();
        assert_eq!(head, vec![1, 3, 4]);
    }

    #[test]
    fn deck_without_leaves_original() {
        let deck = Deck::full();
        let smaller = deck.without(card(5));
        assert_eq!(deck.len(), DECK_SIZE);
        assert!(deck.contains(card(5)));
        assert_eq!(smaller.len(), DECK_SIZE - 1);
        assert!(!smaller.contains(card(5)));
    }
}
