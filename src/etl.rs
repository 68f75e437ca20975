pub mod draw_map;
pub mod parse_osm;
pub mod road_graph;

use log::{info, error};

use crate::errors::Result;


/// One stage of the map pipeline. `process` runs the three phases in order and logs the
/// boundaries, so a failing stage is always reported before the error propagates.
pub trait Etl {
    type Source;
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    fn extract(&mut self, source: Self::Source) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    fn load(&mut self, output: &Self::Output) -> Result<()>;

    fn process(&mut self, source: Self::Source) -> Result<Self::Output> {
        info!(etl_name = self.etl_name(); "Starting ETL process");

        info!(etl_name = self.etl_name(); "Extracting");
        let input = match self.extract(source) {
            Ok(input) => Ok(input),
            Err(err) => {
                error!(etl_name = self.etl_name(), err = err.message.as_str(); "Extraction failed with error");
                Err(err)
            },
        }?;

        info!(etl_name = self.etl_name(); "Transforming");
        let output = match self.transform(input) {
            Ok(output) => Ok(output),
            Err(err) => {
                error!(etl_name = self.etl_name(), err = err.message.as_str(); "Transformation failed with error");
                Err(err)
            },
        }?;

        info!(etl_name = self.etl_name(); "Loading");
        match self.load(&output) {
            Ok(_) => Ok(()),
            Err(err) => {
                error!(etl_name = self.etl_name(), err = err.message.as_str(); "Loading failed with error");
                Err(err)
            },
        }?;

        info!(etl_name = self.etl_name(); "Process finished");
        Ok(output)
    }
}
