//! Discretized pheromone field.
//!
//! Two decaying scalar layers (home trail, food trail) plus a static cell layer
//! holding obstacles and food, all stored as flat row-major buffers.

use crate::config::{Config, Patch};
use serde::{Deserialize, Serialize};

/// Pheromone layer selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    /// "I came from the nest".
    Home,
    /// "I came from food".
    Food,
}

/// Static content of a grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Obstacle,
    /// Remaining food units.
    Food(u32),
}

/// Grid coordinates; may lie outside the grid.
pub type CellPos = (i64, i64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    cols: usize,
    rows: usize,
    cell_size: f64,
    intensity_max: f32,
    epsilon: f32,
    home: Vec<f32>,
    food: Vec<f32>,
    cells: Vec<Cell>,
}

impl Field {
    pub fn new(cols: usize, rows: usize, cell_size: f64, intensity_max: f32, epsilon: f32) -> Self {
        let n_cells = cols * rows;
        Self {
            cols,
            rows,
            cell_size,
            intensity_max,
            epsilon,
            home: vec![0.0; n_cells],
            food: vec![0.0; n_cells],
            cells: vec![Cell::Empty; n_cells],
        }
    }

    /// Build the field described by a configuration, including its static layout.
    pub fn from_config(cfg: &Config) -> Self {
        let mut field = Self::new(
            cfg.world.cols,
            cfg.world.rows,
            cfg.world.cell_size,
            cfg.pheromone.intensity_max,
            cfg.pheromone.epsilon,
        );
        for patch in &cfg.layout.obstacles {
            field.fill(patch, Cell::Obstacle);
        }
        for food in &cfg.layout.food {
            field.fill(&food.patch(), Cell::Food(food.amount));
        }
        field
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn width(&self) -> f64 {
        self.cols as f64 * self.cell_size
    }

    pub fn height(&self) -> f64 {
        self.rows as f64 * self.cell_size
    }

    /// Cell containing the world point `(x, y)`.
    pub fn cell_at(&self, x: f64, y: f64) -> CellPos {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    pub fn contains(&self, (col, row): CellPos) -> bool {
        (0..self.cols as i64).contains(&col) && (0..self.rows as i64).contains(&row)
    }

    #[inline(always)]
    fn index(&self, pos: CellPos) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let (col, row) = pos;
        Some(row as usize * self.cols + col as usize)
    }

    fn layer(&self, layer: Layer) -> &[f32] {
        match layer {
            Layer::Home => &self.home,
            Layer::Food => &self.food,
        }
    }

    /// Add `amount` to a cell, clamped to the maximum intensity.
    ///
    /// Out-of-range cells are ignored.
    pub fn deposit(&mut self, pos: CellPos, layer: Layer, amount: f32) {
        let Some(idx) = self.index(pos) else {
            return;
        };
        let intensity_max = self.intensity_max;
        let values = match layer {
            Layer::Home => &mut self.home,
            Layer::Food => &mut self.food,
        };
        values[idx] = (values[idx] + amount).min(intensity_max);
    }

    /// Intensity of a cell, or zero outside the grid.
    pub fn sample(&self, pos: CellPos, layer: Layer) -> f32 {
        self.index(pos).map_or(0.0, |idx| self.layer(layer)[idx])
    }

    /// Multiply every intensity by `rate`, snapping values below epsilon to zero.
    pub fn decay_all(&mut self, rate: f32) {
        let epsilon = self.epsilon;
        for value in self.home.iter_mut().chain(self.food.iter_mut()) {
            *value *= rate;
            if *value < epsilon {
                *value = 0.0;
            }
        }
    }

    pub fn clear_pheromones(&mut self) {
        self.home.fill(0.0);
        self.food.fill(0.0);
    }

    /// Static content of a cell; `None` outside the grid.
    pub fn cell(&self, pos: CellPos) -> Option<Cell> {
        self.index(pos).map(|idx| self.cells[idx])
    }

    pub fn is_obstacle(&self, pos: CellPos) -> bool {
        self.cell(pos) == Some(Cell::Obstacle)
    }

    pub fn food_at(&self, pos: CellPos) -> u32 {
        match self.cell(pos) {
            Some(Cell::Food(amount)) => amount,
            _ => 0,
        }
    }

    /// Remove up to `amount` food units; returns the number actually taken.
    ///
    /// A cell whose food runs out becomes empty.
    pub fn consume_food(&mut self, pos: CellPos, amount: u32) -> u32 {
        let Some(idx) = self.index(pos) else {
            return 0;
        };
        let Cell::Food(left) = self.cells[idx] else {
            return 0;
        };
        let taken = left.min(amount);
        self.cells[idx] = match left - taken {
            0 => Cell::Empty,
            rest => Cell::Food(rest),
        };
        taken
    }

    /// Overwrite the static content of a cell. Out-of-range cells are ignored.
    pub fn set_cell(&mut self, pos: CellPos, cell: Cell) {
        let cell = match cell {
            Cell::Food(0) => Cell::Empty,
            other => other,
        };
        if let Some(idx) = self.index(pos) {
            self.cells[idx] = cell;
        }
    }

    fn fill(&mut self, patch: &Patch, cell: Cell) {
        for (col, row) in patch.cells() {
            self.set_cell((col as i64, row as i64), cell);
        }
    }

    /// Total intensity held by a layer.
    pub fn mass(&self, layer: Layer) -> f64 {
        self.layer(layer).iter().map(|&v| v as f64).sum()
    }

    /// Total food units left on the grid.
    pub fn food_remaining(&self) -> u64 {
        self.cells
            .iter()
            .map(|cell| match cell {
                Cell::Food(amount) => *amount as u64,
                _ => 0,
            })
            .sum()
    }

    pub fn home_layer(&self) -> &[f32] {
        &self.home
    }

    pub fn food_layer(&self) -> &[f32] {
        &self.food
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Field {
        Field::new(10, 8, 2.0, 255.0, 0.01)
    }

    #[test]
    fn cell_lookup_floors_world_coordinates() {
        let field = field();
        assert_eq!(field.cell_at(0.0, 0.0), (0, 0));
        assert_eq!(field.cell_at(3.9, 2.0), (1, 1));
        assert_eq!(field.cell_at(-0.1, 5.0), (-1, 2));
        assert!(!field.contains((10, 0)));
        assert!(field.contains((9, 7)));
    }

    #[test]
    fn deposit_is_clamped() {
        let mut field = field();
        for _ in 0..100 {
            field.deposit((3, 3), Layer::Food, 40.0);
            assert!(field.sample((3, 3), Layer::Food) <= 255.0);
        }
        field.deposit((3, 3), Layer::Food, 1e9);
        assert_eq!(field.sample((3, 3), Layer::Food), 255.0);
        assert_eq!(field.sample((3, 3), Layer::Home), 0.0);
    }

    #[test]
    fn out_of_range_access_is_silent() {
        let mut field = field();
        field.deposit((-1, 0), Layer::Home, 5.0);
        field.deposit((10, 8), Layer::Home, 5.0);
        assert_eq!(field.sample((-1, 0), Layer::Home), 0.0);
        assert_eq!(field.mass(Layer::Home), 0.0);
        assert!(!field.is_obstacle((100, 100)));
        assert_eq!(field.food_at((-5, 2)), 0);
        assert_eq!(field.consume_food((-5, 2), 3), 0);
    }

    #[test]
    fn decay_is_geometric_then_exactly_zero() {
        let mut field = field();
        let rate = 0.9_f32;
        field.deposit((4, 4), Layer::Home, 100.0);

        let mut expected = 100.0_f32;
        let mut n_ticks = 0;
        while expected * rate >= 0.01 {
            field.decay_all(rate);
            expected *= rate;
            n_ticks += 1;
            assert_eq!(field.sample((4, 4), Layer::Home), expected);
        }
        assert!(n_ticks > 50);

        field.decay_all(rate);
        assert_eq!(field.sample((4, 4), Layer::Home), 0.0);
        field.decay_all(rate);
        assert_eq!(field.sample((4, 4), Layer::Home), 0.0);
    }

    #[test]
    fn consume_food_never_goes_negative() {
        let mut field = field();
        field.set_cell((2, 2), Cell::Food(5));
        assert_eq!(field.consume_food((2, 2), 3), 3);
        assert_eq!(field.food_at((2, 2)), 2);
        assert_eq!(field.consume_food((2, 2), 3), 2);
        assert_eq!(field.food_at((2, 2)), 0);
        assert_eq!(field.cell((2, 2)), Some(Cell::Empty));
        assert_eq!(field.consume_food((2, 2), 3), 0);
    }

    #[test]
    fn obstacles_replace_food() {
        let mut field = field();
        field.set_cell((1, 1), Cell::Food(9));
        field.set_cell((1, 1), Cell::Obstacle);
        assert!(field.is_obstacle((1, 1)));
        assert_eq!(field.food_remaining(), 0);
        field.set_cell((1, 1), Cell::Empty);
        assert!(!field.is_obstacle((1, 1)));
    }
}
