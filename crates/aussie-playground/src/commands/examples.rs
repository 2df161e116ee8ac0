use eyre::{Result, eyre};

use crate::catalog;

pub struct ExamplesCommand {
    pub name: Option<String>,
}

impl ExamplesCommand {
    pub fn execute(self) -> Result<()> {
        match self.name {
            Some(name) => {
                let example = catalog::find(&name)
                    .ok_or_else(|| eyre!("no example named `{name}`; try `aussie examples`"))?;
                print!("{}", example.source);
                Ok(())
            }
            None => {
                for example in &catalog::EXAMPLES {
                    println!("{}", example.name);
                }
                Ok(())
            }
        }
    }
}
