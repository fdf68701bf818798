use super::evaluation::Evaluation;

/// Piecewise linear function given by sampling points with strictly increasing `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tabulated1DFunction {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Tabulated1DFunction {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, String> {
        if x.len() != y.len() {
            return Err(format!(
                "x and y columns differ in length: {} vs {}",
                x.len(),
                y.len()
            ));
        }
        if x.len() < 2 {
            return Err("a table needs at least two sampling points".to_string());
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err("x column of a table must be strictly increasing".to_string());
        }
        Ok(Self { x, y })
    }

    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    pub fn num_samples(&self) -> usize {
        self.x.len()
    }

    fn segment(&self, x: f64, extrapolate: bool) -> Result<usize, String> {
        if !extrapolate && (x < self.x_min() || x > self.x_max()) {
            return Err(format!(
                "{} is outside of the table domain [{}, {}]",
                x,
                self.x_min(),
                self.x_max()
            ));
        }
        // first sampling point strictly above x, end segments are reused beyond the domain
        let upper = self.x.partition_point(|&xi| xi <= x);
        Ok(upper.clamp(1, self.x.len() - 1) - 1)
    }

    fn slope(&self, seg: usize) -> f64 {
        (self.y[seg + 1] - self.y[seg]) / (self.x[seg + 1] - self.x[seg])
    }

    pub fn eval(&self, x: f64, extrapolate: bool) -> Result<f64, String> {
        let seg = self.segment(x, extrapolate)?;
        Ok(self.y[seg] + self.slope(seg) * (x - self.x[seg]))
    }

    /// Evaluates on a dual number, the derivative is the segment slope times the derivative of `x`.
    pub fn eval_evaluation(&self, x: &Evaluation, extrapolate: bool) -> Result<Evaluation, String> {
        let seg = self.segment(x.re, extrapolate)?;
        let slope = self.slope(seg);
        Ok((*x - self.x[seg]) * slope + self.y[seg])
    }
}
