/// Ordered colour list assigned to series by index, wrapping around
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<String>,
}

const PLAYGROUND: [&str; 6] = ["#60a5fa", "#34d399", "#fbbf24", "#f472b6", "#a78bfa", "#f87171"];
const DASHBOARD: [&str; 8] = [
    "#60a5fa", "#34d399", "#fbbf24", "#f472b6", "#a78bfa", "#f87171", "#22d3ee", "#fb923c",
];

impl Palette {
    /// Six-colour palette the playground starts with
    pub fn playground() -> Self {
        Self::from_static(&PLAYGROUND)
    }

    /// Eight-colour palette used when a dashboard chart names none
    pub fn dashboard() -> Self {
        Self::from_static(&DASHBOARD)
    }

    fn from_static(colors: &[&str]) -> Self {
        Self {
            colors: colors.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Use the given colours, or `fallback` when there are none
    pub fn from_colors(colors: Option<&[String]>, fallback: Palette) -> Self {
        match colors {
            Some(c) if !c.is_empty() => Self { colors: c.to_vec() },
            _ => fallback,
        }
    }

    pub fn color(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Replace one colour; out-of-range indices extend the palette with grey
    pub fn set(&mut self, index: usize, color: impl Into<String>) {
        while self.colors.len() <= index {
            self.colors.push("#999999".to_string());
        }
        self.colors[index] = color.into();
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::dashboard()
    }
}
