//! Geometry and rock properties the discretization queries per cell and per connection.
use super::errors::BlackOilError;
use serde::{Deserialize, Serialize};

/// Connection to a neighbouring cell as seen from one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub cell: usize,
    pub connection: usize,
}

pub trait Problem {
    fn num_cells(&self) -> usize;
    fn neighbors(&self, cell: usize) -> &[Neighbor];
    /// transmissibility of the connection between two cells, zero if not connected
    fn transmissibility(&self, i: usize, j: usize) -> f64;
    fn face_area(&self, i: usize, j: usize) -> f64;
    /// pressure difference a connection has to overcome before fluid moves, Pa
    fn threshold_pressure(&self, i: usize, j: usize) -> f64;
    fn dof_center_depth(&self, cell: usize) -> f64;
    fn dof_total_volume(&self, cell: usize) -> f64;
    fn reference_porosity(&self, cell: usize) -> f64;
    fn satnum_region_index(&self, cell: usize) -> usize;
    fn pvt_region_index(&self, cell: usize) -> usize;
    fn gravity(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellData {
    /// m, positive downwards
    pub depth: f64,
    /// m^3
    pub volume: f64,
    pub porosity: f64,
    #[serde(default)]
    pub satnum: usize,
    #[serde(default)]
    pub pvtnum: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub i: usize,
    pub j: usize,
    pub transmissibility: f64,
    pub area: f64,
    #[serde(default)]
    pub threshold_pressure: f64,
}

/// Unstructured grid given as a list of cells and two-point connections.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionGraphProblem {
    cells: Vec<CellData>,
    connections: Vec<Connection>,
    adjacency: Vec<Vec<Neighbor>>,
    gravity: f64,
}

impl ConnectionGraphProblem {
    pub fn new(cells: Vec<CellData>, connections: Vec<Connection>, gravity: f64) -> Result<Self, BlackOilError> {
        let mut adjacency = vec![Vec::new(); cells.len()];
        for (idx, conn) in connections.iter().enumerate() {
            if conn.i >= cells.len() || conn.j >= cells.len() || conn.i == conn.j {
                return Err(BlackOilError::InvalidGrid(format!(
                    "connection {} joins cells {} and {} but the grid has {} cells",
                    idx,
                    conn.i,
                    conn.j,
                    cells.len()
                )));
            }
            if conn.threshold_pressure < 0.0 {
                return Err(BlackOilError::InvalidGrid(format!(
                    "connection {} has a negative threshold pressure",
                    idx
                )));
            }
            adjacency[conn.i].push(Neighbor { cell: conn.j, connection: idx });
            adjacency[conn.j].push(Neighbor { cell: conn.i, connection: idx });
        }
        Ok(Self {
            cells,
            connections,
            adjacency,
            gravity,
        })
    }

    /// Vertical stack of `num_cells` equal cells, cell 0 on top.
    pub fn vertical_column(
        num_cells: usize,
        cell_height: f64,
        area: f64,
        permeability: f64,
        porosity: f64,
        top_depth: f64,
    ) -> Result<Self, BlackOilError> {
        if num_cells == 0 || cell_height <= 0.0 || area <= 0.0 {
            return Err(BlackOilError::InvalidGrid(
                "column needs at least one cell of positive size".to_string(),
            ));
        }
        let cells = (0..num_cells)
            .map(|k| CellData {
                depth: top_depth + (k as f64 + 0.5) * cell_height,
                volume: cell_height * area,
                porosity,
                satnum: 0,
                pvtnum: 0,
            })
            .collect();
        // two-point flux between equal cells: k A / dz
        let connections = (1..num_cells)
            .map(|k| Connection {
                i: k - 1,
                j: k,
                transmissibility: permeability * area / cell_height,
                area,
                threshold_pressure: 0.0,
            })
            .collect();
        Self::new(cells, connections, 9.80665)
    }

    pub fn cells(&self) -> &[CellData] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [CellData] {
        &mut self.cells
    }

    pub fn set_threshold_pressure(&mut self, i: usize, j: usize, value: f64) -> Result<(), BlackOilError> {
        let conn = self
            .find_connection(i, j)
            .ok_or(BlackOilError::InvalidGrid(format!("cells {} and {} are not connected", i, j)))?;
        self.connections[conn].threshold_pressure = value;
        Ok(())
    }

    fn find_connection(&self, i: usize, j: usize) -> Option<usize> {
        self.adjacency
            .get(i)?
            .iter()
            .find(|n| n.cell == j)
            .map(|n| n.connection)
    }
}

impl Problem for ConnectionGraphProblem {
    fn num_cells(&self) -> usize {
        self.cells.len()
    }
    fn neighbors(&self, cell: usize) -> &[Neighbor] {
        &self.adjacency[cell]
    }
    fn transmissibility(&self, i: usize, j: usize) -> f64 {
        self.find_connection(i, j)
            .map_or(0.0, |c| self.connections[c].transmissibility)
    }
    fn face_area(&self, i: usize, j: usize) -> f64 {
        self.find_connection(i, j).map_or(0.0, |c| self.connections[c].area)
    }
    fn threshold_pressure(&self, i: usize, j: usize) -> f64 {
        self.find_connection(i, j)
            .map_or(0.0, |c| self.connections[c].threshold_pressure)
    }
    fn dof_center_depth(&self, cell: usize) -> f64 {
        self.cells[cell].depth
    }
    fn dof_total_volume(&self, cell: usize) -> f64 {
        self.cells[cell].volume
    }
    fn reference_porosity(&self, cell: usize) -> f64 {
        self.cells[cell].porosity
    }
    fn satnum_region_index(&self, cell: usize) -> usize {
        self.cells[cell].satnum
    }
    fn pvt_region_index(&self, cell: usize) -> usize {
        self.cells[cell].pvtnum
    }
    fn gravity(&self) -> f64 {
        self.gravity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn column_connects_consecutive_cells() {
        let problem = ConnectionGraphProblem::vertical_column(3, 2.0, 4.0, 1e-13, 0.2, 100.0).unwrap();
        assert_eq!(problem.num_cells(), 3);
        assert_eq!(problem.neighbors(1).len(), 2);
        assert_relative_eq!(problem.transmissibility(0, 1), 2e-13);
        assert_relative_eq!(problem.transmissibility(1, 0), 2e-13);
        assert_eq!(problem.transmissibility(0, 2), 0.0);
        assert_relative_eq!(problem.dof_center_depth(2), 105.0);
        assert_relative_eq!(problem.dof_total_volume(0), 8.0);
    }

    #[test]
    fn threshold_pressure_is_symmetric() {
        let mut problem = ConnectionGraphProblem::vertical_column(2, 1.0, 1.0, 1e-13, 0.2, 0.0).unwrap();
        problem.set_threshold_pressure(1, 0, 5.0e4).unwrap();
        assert_eq!(problem.threshold_pressure(0, 1), 5.0e4);
        assert_eq!(problem.threshold_pressure(1, 0), 5.0e4);
        assert!(problem.set_threshold_pressure(0, 0, 1.0).is_err());
    }

    #[test]
    fn dangling_connection_is_rejected() {
        let cells = vec![CellData {
            depth: 0.0,
            volume: 1.0,
            porosity: 0.1,
            satnum: 0,
            pvtnum: 0,
        }];
        let conn = Connection {
            i: 0,
            j: 1,
            transmissibility: 1.0,
            area: 1.0,
            threshold_pressure: 0.0,
        };
        assert!(ConnectionGraphProblem::new(cells, vec![conn], 9.81).is_err());
    }
}
