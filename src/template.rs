use csv_async::AsyncWriterBuilder;
use tokio::io::AsyncWrite;

use crate::fields::LEAD_FIELDS;
use crate::ImportResult;

/// Example row, one cell per entry of [`LEAD_FIELDS`].
pub const EXAMPLE_ROW: [&str; 15] = [
    "João Silva",
    "joao.silva@empresa.com.br",
    "(11) 98888-7777",
    "Empresa Exemplo Ltda",
    "Gerente Comercial",
    "1.500,00",
    "novo",
    "morno",
    "Indicação",
    "2025-01-15",
    "01310-100",
    "Av. Paulista, 1000",
    "São Paulo",
    "SP",
    "Primeiro contato na feira",
];

/// Write the starter CSV: canonical labels as header plus one example row,
/// comma-delimited UTF-8.
pub async fn write_template<W>(writer: W) -> ImportResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut wtr = AsyncWriterBuilder::new().create_writer(writer);
    let header: Vec<String> = LEAD_FIELDS.iter().map(|f| f.display_label()).collect();
    wtr.write_record(&header).await?;
    wtr.write_record(EXAMPLE_ROW).await?;
    wtr.flush().await?;
    Ok(())
}

pub async fn template_bytes() -> ImportResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_template(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn header_and_example_row() {
        let bytes = template_bytes().await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Nome *,Email *,Telefone,Empresa,Cargo,Valor,Etapa,Temperatura,Origem,Próximo Contato,CEP,Endereço,Cidade,Estado,Observações")
        );
        let example = lines.next().unwrap();
        assert!(example.contains("\"1.500,00\""));
        assert!(example.contains("\"Av. Paulista, 1000\""));
        assert_eq!(lines.next(), None);
    }
}
