// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::weight::WeighingSystem;
use crate::weight::interface::AsyncStrainGaugeInterface;
use heapless::Vec;
use log::trace;
use micromath::statistics::Mean;

/// Upper bound on how many conversions are averaged for one value.
pub const MAX_SAMPLES: usize = 16;
pub const TARE_SAMPLES: usize = 10;

#[derive(Debug, PartialEq, Eq)]
pub enum Error<StrainGaugeE> {
    StrainGaugeReadingError(StrainGaugeE),
}

pub struct WeightScale<StrainGauge> {
    strain_gauge: StrainGauge,
    tare_offset: f32,
    counts_per_gram: f32,
    samples_per_reading: usize,
}

impl<StrainGauge, StrainGaugeE> WeightScale<StrainGauge>
where
    StrainGauge: AsyncStrainGaugeInterface<Error = StrainGaugeE>,
{
    /// `counts_per_gram` is the calibration factor, the raw count change for one gram on the
    /// load cell.
    pub async fn new(
        mut strain_gauge: StrainGauge,
        counts_per_gram: f32,
        samples_per_reading: usize,
    ) -> Result<Self, Error<StrainGaugeE>> {
        strain_gauge
            .initialize()
            .await
            .map_err(Error::StrainGaugeReadingError)?;
        Ok(Self {
            strain_gauge,
            tare_offset: 0.0,
            counts_per_gram,
            samples_per_reading: samples_per_reading.clamp(1, MAX_SAMPLES),
        })
    }

    async fn get_average_raw_reading(&mut self, samples: usize) -> Result<f32, Error<StrainGaugeE>> {
        let mut measurement_buffer = Vec::<f32, MAX_SAMPLES>::new();

        for _ in 0..samples.clamp(1, MAX_SAMPLES) {
            let reading = self
                .strain_gauge
                .get_next_reading()
                .await
                .map_err(Error::StrainGaugeReadingError)?;
            if measurement_buffer.push(reading as f32).is_err() {
                break;
            }
        }

        Ok(measurement_buffer.into_iter().mean())
    }

    pub async fn tare(&mut self) -> Result<(), Error<StrainGaugeE>> {
        self.tare_offset = self.get_average_raw_reading(TARE_SAMPLES).await?;
        trace!("Tare offset = {}", self.tare_offset);
        Ok(())
    }

    pub async fn get_weight_grams(&mut self) -> Result<f32, Error<StrainGaugeE>> {
        let reading = self
            .get_average_raw_reading(self.samples_per_reading)
            .await?;
        trace!("Reading = {}", reading);
        let tared_reading = reading - self.tare_offset;
        Ok(tared_reading / self.counts_per_gram)
    }

    pub async fn power_down(&mut self) -> Result<(), Error<StrainGaugeE>> {
        self.strain_gauge
            .power_down()
            .await
            .map_err(Error::StrainGaugeReadingError)
    }
}

impl<StrainGauge, StrainGaugeE> WeighingSystem for WeightScale<StrainGauge>
where
    StrainGauge: AsyncStrainGaugeInterface<Error = StrainGaugeE>,
    StrainGaugeE: core::fmt::Debug,
{
    type Error = Error<StrainGaugeE>;

    async fn tare(&mut self) -> Result<(), Self::Error> {
        WeightScale::tare(self).await
    }

    async fn get_reading(&mut self) -> Result<f32, Self::Error> {
        self.get_weight_grams().await
    }

    async fn power_down(&mut self) -> Result<(), Self::Error> {
        WeightScale::power_down(self).await
    }
}
