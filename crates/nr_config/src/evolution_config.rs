// crates/nr_config/src/evolution_config.rs

//! EvolutionConfig - 演化配置（全 f64）
//!
//! 定义网格、时间推进、规范条件、诊断与输出的全部参数，
//! 以 JSON 文件形式加载和保存。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// 演化配置
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EvolutionConfig {
    /// 网格配置
    #[serde(default)]
    pub grid: GridConfig,

    /// 时间推进配置
    #[serde(default)]
    pub time: TimeConfig,

    /// 规范条件
    #[serde(default)]
    pub gauge: GaugeConfig,

    /// 初始数据
    #[serde(default)]
    pub initial_data: InitialDataConfig,

    /// 约束诊断
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// 并行配置
    #[serde(default)]
    pub parallel: ParallelConfig,

    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,
}

// ============================================================
// 网格
// ============================================================

/// 网格配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridConfig {
    /// x 方向单元数
    #[serde(default = "default_extent")]
    pub nx: usize,
    /// y 方向单元数
    #[serde(default = "default_extent")]
    pub ny: usize,
    /// z 方向单元数
    #[serde(default = "default_extent")]
    pub nz: usize,
    /// 网格间距 [dx, dy, dz]
    #[serde(default = "default_spacing")]
    pub spacing: [f64; 3],
    /// 单元 (0,0,0) 的物理坐标；缺省时网格以原点为中心
    #[serde(default)]
    pub origin: Option<[f64; 3]>,
}

fn default_extent() -> usize { 24 }
fn default_spacing() -> [f64; 3] { [0.25, 0.25, 0.25] }

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nx: default_extent(),
            ny: default_extent(),
            nz: default_extent(),
            spacing: default_spacing(),
            origin: None,
        }
    }
}

impl GridConfig {
    /// 单元总数
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// 实际使用的原点（缺省时居中）
    pub fn resolved_origin(&self) -> [f64; 3] {
        self.origin.unwrap_or_else(|| {
            [
                -0.5 * (self.nx as f64 - 1.0) * self.spacing[0],
                -0.5 * (self.ny as f64 - 1.0) * self.spacing[1],
                -0.5 * (self.nz as f64 - 1.0) * self.spacing[2],
            ]
        })
    }
}

// ============================================================
// 时间推进
// ============================================================

/// 时间推进配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeConfig {
    /// CFL 数
    #[serde(default = "default_cfl")]
    pub cfl: f64,
    /// 特征传播速度下限（光速单位）
    #[serde(default = "default_speed")]
    pub characteristic_speed: f64,
    /// 初始时间步长，同时作为自适应步长上限
    #[serde(default = "default_initial_dt")]
    pub initial_dt: f64,
    /// 最小时间步长，低于此值视为坍缩
    #[serde(default = "default_dt_min")]
    pub dt_min: f64,
    /// 演化步数
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// 每步合成后检查状态是否有限
    #[serde(default = "default_true")]
    pub check_finite: bool,
}

fn default_cfl() -> f64 { 0.5 }
fn default_speed() -> f64 { 1.0 }
fn default_initial_dt() -> f64 { 0.05 }
fn default_dt_min() -> f64 { 1e-12 }
fn default_steps() -> usize { 30 }
fn default_true() -> bool { true }

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            cfl: default_cfl(),
            characteristic_speed: default_speed(),
            initial_dt: default_initial_dt(),
            dt_min: default_dt_min(),
            steps: default_steps(),
            check_finite: true,
        }
    }
}

// ============================================================
// 规范条件
// ============================================================

/// lapse 切片条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlicingKind {
    /// 1+log 切片: ∂t α = -2 α K
    #[default]
    OnePlusLog,
    /// 调和切片: ∂t α = -α² K
    Harmonic,
    /// 测地切片: ∂t α = 0
    Geodesic,
}

/// shift 条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShiftKind {
    /// 冻结: ∂t β = 0
    #[default]
    Frozen,
    /// 阻尼平流: ∂t β^i = β^j ∂_j β^i - η β^i
    Damped,
}

/// 规范配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GaugeConfig {
    /// lapse 切片条件
    #[serde(default)]
    pub slicing: SlicingKind,
    /// shift 条件
    #[serde(default)]
    pub shift: ShiftKind,
    /// shift 阻尼系数 η
    #[serde(default = "default_eta")]
    pub shift_damping: f64,
    /// lapse 是否包含平流项 β^i ∂_i α
    #[serde(default = "default_true")]
    pub advect_lapse: bool,
}

fn default_eta() -> f64 { 2.0 }

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            slicing: SlicingKind::default(),
            shift: ShiftKind::default(),
            shift_damping: default_eta(),
            advect_lapse: true,
        }
    }
}

// ============================================================
// 初始数据
// ============================================================

/// 初始数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitialDataKind {
    /// 平直时空
    #[default]
    Flat,
    /// 各向同性坐标下的 Schwarzschild 穿刺
    Schwarzschild,
}

/// 初始数据配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitialDataConfig {
    /// 类型
    #[serde(default)]
    pub kind: InitialDataKind,
    /// 黑洞质量 M
    #[serde(default = "default_mass")]
    pub mass: f64,
    /// 穿刺中心
    #[serde(default)]
    pub center: [f64; 3],
}

fn default_mass() -> f64 { 1.0 }

impl Default for InitialDataConfig {
    fn default() -> Self {
        Self {
            kind: InitialDataKind::default(),
            mass: default_mass(),
            center: [0.0; 3],
        }
    }
}

// ============================================================
// 诊断
// ============================================================

/// 约束诊断配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsConfig {
    /// 各 RK 级是否计算约束（默认跳过第 1 级）
    #[serde(default = "default_constraint_stages")]
    pub constraint_stages: [bool; 4],
    /// 每隔多少步输出一次日志（0 表示只在最后一步）
    #[serde(default = "default_log_every")]
    pub log_every: usize,
}

fn default_constraint_stages() -> [bool; 4] { [true, false, true, true] }
fn default_log_every() -> usize { 1 }

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            constraint_stages: default_constraint_stages(),
            log_every: default_log_every(),
        }
    }
}

// ============================================================
// 并行
// ============================================================

/// 并行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParallelKind {
    /// 串行执行
    Sequential,
    /// 始终并行
    Parallel,
    /// 按单元数自动选择
    #[default]
    Auto,
}

/// 并行配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelConfig {
    /// 并行策略
    #[serde(default)]
    pub strategy: ParallelKind,
    /// Auto 策略下启用并行的最小单元数
    #[serde(default = "default_min_parallel")]
    pub min_parallel_cells: usize,
}

fn default_min_parallel() -> usize { 4096 }

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            strategy: ParallelKind::default(),
            min_parallel_cells: default_min_parallel(),
        }
    }
}

// ============================================================
// 输出
// ============================================================

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// 最后一步是否导出 CSV 切片
    #[serde(default = "default_true")]
    pub export_slices: bool,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            export_slices: true,
        }
    }
}

// ============================================================
// 加载、验证、保存
// ============================================================

impl EvolutionConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json(&content)
    }

    /// 从 JSON 字符串解析并验证
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: EvolutionConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.grid;
        for (key, n) in [("grid.nx", g.nx), ("grid.ny", g.ny), ("grid.nz", g.nz)] {
            // 内部区域至少需要一个单元
            if n < 3 {
                return Err(ConfigError::invalid(key, n, "每个方向至少需要 3 个单元"));
            }
        }
        for (axis, h) in g.spacing.iter().enumerate() {
            if !(h.is_finite() && *h > 0.0) {
                let key = ["grid.spacing[0]", "grid.spacing[1]", "grid.spacing[2]"][axis];
                return Err(ConfigError::invalid(key, h, "网格间距必须为有限正数"));
            }
        }

        let t = &self.time;
        if !(t.cfl > 0.0 && t.cfl <= 1.0) {
            return Err(ConfigError::invalid("time.cfl", t.cfl, "CFL 必须在 (0, 1] 范围内"));
        }
        if !(t.characteristic_speed > 0.0 && t.characteristic_speed.is_finite()) {
            return Err(ConfigError::invalid(
                "time.characteristic_speed",
                t.characteristic_speed,
                "特征速度必须为有限正数",
            ));
        }
        if !(t.initial_dt > 0.0 && t.initial_dt.is_finite()) {
            return Err(ConfigError::invalid("time.initial_dt", t.initial_dt, "必须为有限正数"));
        }
        if t.dt_min < 0.0 || t.dt_min > t.initial_dt {
            return Err(ConfigError::invalid(
                "time.dt_min",
                t.dt_min,
                "必须非负且不大于 initial_dt",
            ));
        }

        if self.gauge.shift_damping < 0.0 {
            return Err(ConfigError::invalid(
                "gauge.shift_damping",
                self.gauge.shift_damping,
                "阻尼系数不能为负",
            ));
        }

        if self.initial_data.kind == InitialDataKind::Schwarzschild && self.initial_data.mass <= 0.0 {
            return Err(ConfigError::invalid(
                "initial_data.mass",
                self.initial_data.mass,
                "黑洞质量必须为正",
            ));
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}
