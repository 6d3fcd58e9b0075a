use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

/// Метрики, обновляемые lock-free из потоков захвата и записи.
#[derive(Debug, Default)]
pub struct RecorderMetrics {
    pub scans_acquired: AtomicU64,
    pub scans_written: AtomicU64,
    pub scans_dropped: AtomicU64,
    /// Сканы, в которых хотя бы один пиксель был в насыщении
    pub saturated_scans: AtomicU64,
    pub write_errors: AtomicU64,
    pub bytes_written: AtomicU64,
}

/// Snapshot метрик для отображения / тестирования.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub duration_secs: f64,
    pub scans_acquired: u64,
    pub scans_written: u64,
    pub scans_dropped: u64,
    pub saturated_scans: u64,
    pub write_errors: u64,
    pub bytes_written: u64,
    pub scan_rate_hz: f64,
    pub drop_rate_pct: f64,
}

impl RecorderMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Частота записанных сканов, Гц.
    pub fn scan_rate_hz(
        &self,
        elapsed: &Instant,
    ) -> f64 {
        let secs = elapsed.elapsed().as_secs_f64();

        if secs < 1e-9 {
            return 0.0;
        }

        self.scans_written.load(Ordering::Relaxed) as f64 / secs
    }

    /// Процент потерянных сканов (0.0-100.0).
    pub fn drop_rate_pct(&self) -> f64 {
        let acquired = self.scans_acquired.load(Ordering::Relaxed);
        let dropped = self.scans_dropped.load(Ordering::Relaxed);

        if acquired == 0 {
            0.0
        } else {
            dropped as f64 / acquired as f64 * 100.0
        }
    }

    /// Итоговая сводка для вывода в конце сессии.
    pub fn summary(
        &self,
        elapsed: &Instant,
    ) -> MetricsSummary {
        MetricsSummary {
            duration_secs: elapsed.elapsed().as_secs_f64(),
            scans_acquired: self.scans_acquired.load(Ordering::Relaxed),
            scans_written: self.scans_written.load(Ordering::Relaxed),
            scans_dropped: self.scans_dropped.load(Ordering::Relaxed),
            saturated_scans: self.saturated_scans.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            scan_rate_hz: self.scan_rate_hz(elapsed),
            drop_rate_pct: self.drop_rate_pct(),
        }
    }
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration      : {:.1}s", self.duration_secs)?;
        writeln!(f, "  Acquired      : {}", self.scans_acquired)?;
        writeln!(f, "  Written       : {}", self.scans_written)?;
        writeln!(
            f,
            "  Dropped       : {} ({:.2}%)",
            self.scans_dropped, self.drop_rate_pct
        )?;
        writeln!(f, "  Saturated     : {}", self.saturated_scans)?;
        writeln!(f, "  Write errors  : {}", self.write_errors)?;
        writeln!(
            f,
            "  Bytes written : {:.1} KB",
            self.bytes_written as f64 / 1e3
        )?;
        writeln!(f, "  Scan rate     : {:.2} Hz", self.scan_rate_hz)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}
