// Application state for the TUI, including a circular 2D spike raster.

use crate::backend::SnnBackend;

pub struct App<B: SnnBackend> {
    pub backend: B,
    pub tick: u64,
    pub width: usize,             // number of columns (time window)
    pub raster: Vec<Vec<char>>,   // [neuron][col]
    pub running: bool,
}

impl<B: SnnBackend> App<B> {
    pub fn new(backend: B, width: usize) -> Self {
        let n = backend.neurons();
        Self {
            backend,
            tick: 0,
            width,
            raster: vec![vec![' '; width]; n],
            running: false,
        }
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
    }

    /// Advance the network by one tick and update the raster for the current column.
    pub fn step(&mut self) {
        let spiking_rows = self.backend.step();
        self.tick = self.tick.saturating_add(1);

        // Circular buffer column
        let col = (self.tick as usize) % self.width;
        for row in self.raster.iter_mut() {
            row[col] = ' ';
        }
        for row in spiking_rows {
            if let Some(cells) = self.raster.get_mut(row) {
                cells[col] = '•';
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blinker {
        on: bool,
    }

    impl SnnBackend for Blinker {
        fn step(&mut self) -> Vec<usize> {
            self.on = !self.on;
            if self.on { vec![0, 5] } else { vec![] }
        }

        fn neurons(&self) -> usize {
            2
        }
    }

    #[test]
    fn step_marks_and_clears_columns() {
        let mut app = App::new(Blinker { on: false }, 2);
        app.step();
        assert_eq!(app.raster[0][1], '•');
        assert_eq!(app.raster[1][1], ' ');
        app.step();
        app.step();
        // column 1 is reused on tick 3
        assert_eq!(app.raster[0][1], '•');
        app.step();
        assert_eq!(app.raster[0][0], ' ');
    }
}
