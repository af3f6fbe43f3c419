// Copyright 2026 The Voxdag Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// The peak of handler tokens in use over a window of samples.
#[derive(Debug)]
pub struct LoadWindow {
    report_ticks: u32,
    ticks: u32,
    peak: usize,
}

impl LoadWindow {
    pub fn new(report_ticks: u32) -> Self {
        LoadWindow { report_ticks: report_ticks.max(1), ticks: 0, peak: 0 }
    }

    /// Record a sample. Every `report_ticks` samples the peak of the finished
    /// window is returned, and a new window starts with this sample.
    pub fn observe(&mut self, in_use: usize) -> Option<usize> {
        self.ticks = (self.ticks + 1) % self.report_ticks;
        let report = if self.ticks == 0 { Some(std::mem::take(&mut self.peak)) } else { None };
        self.peak = self.peak.max(in_use);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_peak_per_window() {
        let mut window = LoadWindow::new(3);
        assert_eq!(window.observe(2), None);
        assert_eq!(window.observe(5), None);
        assert_eq!(window.observe(1), Some(5));
        assert_eq!(window.observe(0), None);
        assert_eq!(window.observe(0), None);
        assert_eq!(window.observe(0), Some(1));
        assert_eq!(window.observe(0), None);
        assert_eq!(window.observe(0), None);
        assert_eq!(window.observe(0), Some(0));
    }

    #[test]
    fn single_tick_window() {
        let mut window = LoadWindow::new(0);
        assert_eq!(window.observe(4), Some(0));
        assert_eq!(window.observe(1), Some(4));
    }
}
