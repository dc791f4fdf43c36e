use alloy::primitives::{Address, Bytes, U256};
use anyhow::Result;
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    config::Config,
    error::{WalletError, WalletResult},
    ethereum::{
        abi,
        contract::{self, ContractCall},
        erc20, fees, history, keys,
        mirrora::{self, MarketAction},
        provider::{ChainContext, ProviderManager},
        transaction, transfer, utils, KeyPair,
    },
};

#[derive(Debug, Clone)]
pub struct WalletMcpServer {
    providers: Arc<ProviderManager>,
    config: Arc<Config>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedWallet {
    mnemonic: String,
    #[serde(flatten)]
    key_pair: KeyPair,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct RestoreFromMnemonicRequest {
    /// BIP-39 seed phrase
    mnemonic: String,
    /// Account index in m/44'/60'/0'/0/{index}; defaults to 0
    index: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct RestoreFromPrivateKeyRequest {
    private_key: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct BalanceRequest {
    address: String,
    /// ERC-20 token contract; native balance when omitted
    contract_address: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TransferRequest {
    private_key: String,
    to: String,
    /// Amount in the smallest unit (decimal or 0x hex)
    amount: String,
    contract_address: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TxParamsRequest {
    from: String,
    to: String,
    amount: String,
    contract_address: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct PushRawTransactionRequest {
    /// Signed transaction, 0x hex
    raw_transaction: String,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct EstimateFeeRequest {
    from: String,
    to: String,
    value: String,
    contract_address: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ReadContractRequest {
    /// Contract ABI as a JSON array (or a string holding one)
    abi: Value,
    method: String,
    contract_address: String,
    #[serde(default)]
    args: Vec<Value>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct WriteContractRequest {
    abi: Value,
    method: String,
    contract_address: String,
    private_key: String,
    #[serde(default)]
    args: Vec<Value>,
    /// Raw calldata; when set, `method` and `args` are not encoded
    data: Option<String>,
    /// Native value in the smallest unit
    value: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct EstimateWriteContractFeeRequest {
    abi: Value,
    method: String,
    contract_address: String,
    from: String,
    #[serde(default)]
    args: Vec<Value>,
    /// Raw calldata; when set, `method` and `args` are not encoded
    data: Option<String>,
    value: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct Erc20ReadRequest {
    contract_address: String,
    /// decimals, balanceOf, allowance, totalSupply, name or symbol
    method: String,
    #[serde(default)]
    args: Vec<Value>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct Erc20WriteRequest {
    contract_address: String,
    /// transfer, approve, transferFrom, increaseAllowance or decreaseAllowance
    method: String,
    private_key: String,
    #[serde(default)]
    args: Vec<Value>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TransactionsRequest {
    address: String,
    contract_address: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TransactionLookupRequest {
    transaction_id: String,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct MarketplaceRequest {
    private_key: String,
    token_id: String,
    /// Sale price in the smallest unit; required by start and update
    price: Option<String>,
    /// Native value sent with `buy`
    value: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct MarketplaceTokenRequest {
    token_id: String,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct MintTokenRequest {
    private_key: String,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct KnownContractsRequest {
    network: Option<String>,
}

/// Pretty JSON on success, `Error: ...` otherwise.
fn respond<T: Serialize>(operation: &str, result: WalletResult<T>) -> String {
    match result {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| "Failed to serialize result".to_string()),
        Err(e) => {
            error!("Failed to {}: {}", operation, e);
            format!("Error: {}", e)
        }
    }
}

fn optional_address(address: Option<&str>) -> WalletResult<Option<Address>> {
    address.map(utils::validate_address).transpose()
}

fn optional_data(data: Option<&str>) -> WalletResult<Option<Bytes>> {
    data.map(|data| utils::decode_hex_data(data).map(Into::into)).transpose()
}

fn sale_price(price: Option<U256>) -> WalletResult<U256> {
    price.ok_or_else(|| WalletError::InvalidArgument("price is required".to_string()))
}

fn optional_quantity(value: Option<&str>) -> WalletResult<Option<U256>> {
    value.map(utils::parse_quantity).transpose()
}

impl WalletMcpServer {
    pub fn new(config: Config) -> Result<Self> {
        let providers = ProviderManager::new(&config)?;
        Ok(Self::with_providers(config, providers))
    }

    fn with_providers(config: Config, providers: ProviderManager) -> Self {
        Self {
            providers: Arc::new(providers),
            config: Arc::new(config),
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting Wallet MCP Server");

        let service = self.clone().serve(stdio()).await?;

        info!("Wallet MCP Server started successfully");
        let _ = service.waiting().await;
        Ok(())
    }

    fn network(&self, network: Option<&str>) -> WalletResult<&ChainContext> {
        self.providers.network(network)
    }

    fn write_guard(&self) -> Option<String> {
        if self.config.security.allow_write_operations {
            None
        } else {
            Some(
                "Error: Write operations are disabled. Use --allow-writes flag to enable transaction sending."
                    .to_string(),
            )
        }
    }

    async fn balance(&self, request: BalanceRequest) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let address = utils::validate_address(&request.address)?;
        let token = optional_address(request.contract_address.as_deref())?;
        let info = erc20::get_balance(context, address, token).await?;
        Ok(json!(info))
    }

    async fn send_transfer(&self, request: TransferRequest) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let to = utils::validate_address(&request.to)?;
        let amount = utils::parse_quantity(&request.amount)?;
        let token = optional_address(request.contract_address.as_deref())?;
        let result = transfer::transfer(context, &request.private_key, to, amount, token).await?;
        Ok(json!(result))
    }

    async fn tx_params(&self, request: TxParamsRequest) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let from = utils::validate_address(&request.from)?;
        let to = utils::validate_address(&request.to)?;
        let amount = utils::parse_quantity(&request.amount)?;
        let token = optional_address(request.contract_address.as_deref())?;
        let preview = transfer::generate_tx_params(context, from, to, amount, token).await?;
        Ok(json!(preview))
    }

    async fn fee(&self, request: EstimateFeeRequest) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let from = utils::validate_address(&request.from)?;
        let to = utils::validate_address(&request.to)?;
        let value = utils::parse_quantity(&request.value)?;
        let token = optional_address(request.contract_address.as_deref())?;
        let estimate = fees::estimate_fee(context, from, to, value, token).await;
        Ok(json!(estimate))
    }

    async fn read(&self, request: ReadContractRequest) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let contract_address = utils::validate_address(&request.contract_address)?;
        let abi = abi::parse_abi(&request.abi)?;
        let call = ContractCall::new(&abi, &request.method, contract_address, &request.args);
        contract::read_contract(context, &call).await
    }

    async fn write(&self, request: WriteContractRequest) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let contract_address = utils::validate_address(&request.contract_address)?;
        let abi = abi::parse_abi(&request.abi)?;
        let data = optional_data(request.data.as_deref())?;
        let value = optional_quantity(request.value.as_deref())?;
        let call = ContractCall::new(&abi, &request.method, contract_address, &request.args);
        let result = contract::write_contract(context, &call, &request.private_key, data, value).await?;
        Ok(json!(result))
    }

    async fn write_fee(&self, request: EstimateWriteContractFeeRequest) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let contract_address = utils::validate_address(&request.contract_address)?;
        let from = utils::validate_address(&request.from)?;
        let abi = abi::parse_abi(&request.abi)?;
        let data = optional_data(request.data.as_deref())?;
        let value = optional_quantity(request.value.as_deref())?;
        let call = ContractCall::new(&abi, &request.method, contract_address, &request.args);
        let estimate = contract::estimate_write_contract_fee(context, &call, from, data, value).await;
        Ok(json!(estimate))
    }

    async fn marketplace_write(
        &self,
        request: MarketplaceRequest,
        action: impl FnOnce(U256, Option<U256>) -> WalletResult<MarketAction>,
    ) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let marketplace =
            mirrora::configured_contract(&self.config, &context.name, mirrora::MARKETPLACE_LABEL)?;
        let token_id = utils::parse_quantity(&request.token_id)?;
        let price = optional_quantity(request.price.as_deref())?;
        let value = optional_quantity(request.value.as_deref())?;
        let action = action(token_id, price)?;
        let result = mirrora::write(context, marketplace, action, &request.private_key, value).await?;
        Ok(json!(result))
    }

    async fn marketplace_token(&self, request: MarketplaceTokenRequest) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let marketplace =
            mirrora::configured_contract(&self.config, &context.name, mirrora::MARKETPLACE_LABEL)?;
        let token_id = utils::parse_quantity(&request.token_id)?;
        mirrora::token_info(context, marketplace, token_id).await
    }

    async fn mint(&self, request: MintTokenRequest) -> WalletResult<Value> {
        let context = self.network(request.network.as_deref())?;
        let token = mirrora::configured_contract(&self.config, &context.name, mirrora::TOKEN_LABEL)?;
        let result = mirrora::mint_token(context, token, &request.private_key).await?;
        Ok(json!(result))
    }

    fn known_contracts(&self, network: Option<&str>) -> WalletResult<Value> {
        let context = self.network(network)?;
        let contracts: serde_json::Map<String, Value> = self
            .config
            .known_contracts(&context.name)
            .into_iter()
            .map(|(label, address)| (label, Value::String(address)))
            .collect();

        Ok(json!({
            "network": context.name,
            "defaultNetwork": self.providers.default_network(),
            "chainId": context.config.chain_id,
            "contracts": contracts,
            "availableNetworks": self.providers.get_available_networks(),
        }))
    }
}

#[tool(tool_box)]
impl WalletMcpServer {
    #[tool(description = "Generate a new wallet: a 12-word mnemonic and its first account")]
    async fn generate_wallet(&self) -> String {
        let result = keys::generate_wallet()
            .map(|(mnemonic, key_pair)| GeneratedWallet { mnemonic, key_pair });
        respond("generate wallet", result)
    }

    #[tool(description = "Derive the address and private key at m/44'/60'/0'/0/{index} from a mnemonic")]
    async fn restore_from_mnemonic(
        &self,
        #[tool(aggr)] request: RestoreFromMnemonicRequest,
    ) -> String {
        let result = if keys::validate_mnemonic(&request.mnemonic) {
            keys::derive_address(&request.mnemonic, request.index)
        } else {
            Err(WalletError::KeyDerivation("Invalid mnemonic".to_string()))
        };
        respond("restore from mnemonic", result)
    }

    #[tool(description = "Recover the checksummed address owning a private key")]
    async fn restore_from_private_key(
        &self,
        #[tool(aggr)] request: RestoreFromPrivateKeyRequest,
    ) -> String {
        let result = keys::recover_address(&request.private_key)
            .map(|address| json!({ "address": address.to_checksum(None) }));
        respond("restore from private key", result)
    }

    #[tool(description = "Get the native balance of an address, or its ERC-20 balance when contract_address is set")]
    async fn get_balance(&self, #[tool(aggr)] request: BalanceRequest) -> String {
        respond("get balance", self.balance(request).await)
    }

    #[tool(description = "Transfer native currency, or ERC-20 tokens when contract_address is set. Amount is in the smallest unit")]
    async fn transfer(&self, #[tool(aggr)] request: TransferRequest) -> String {
        if let Some(refusal) = self.write_guard() {
            return refusal;
        }
        respond("transfer", self.send_transfer(request).await)
    }

    #[tool(description = "Build unsigned, priced transaction parameters for a transfer without signing or sending")]
    async fn generate_tx_params(&self, #[tool(aggr)] request: TxParamsRequest) -> String {
        respond("generate transaction params", self.tx_params(request).await)
    }

    #[tool(description = "Broadcast an already signed raw transaction")]
    async fn push_raw_transaction(
        &self,
        #[tool(aggr)] request: PushRawTransactionRequest,
    ) -> String {
        if let Some(refusal) = self.write_guard() {
            return refusal;
        }
        let result = match self.network(request.network.as_deref()) {
            Ok(context) => transaction::push_raw_transaction(context, &request.raw_transaction).await,
            Err(e) => Err(e),
        };
        respond("push raw transaction", result)
    }

    #[tool(description = "Estimate the fee of a native or ERC-20 transfer")]
    async fn estimate_fee(&self, #[tool(aggr)] request: EstimateFeeRequest) -> String {
        respond("estimate fee", self.fee(request).await)
    }

    #[tool(description = "Call a read-only contract method described by the supplied ABI")]
    async fn read_contract(&self, #[tool(aggr)] request: ReadContractRequest) -> String {
        respond("read contract", self.read(request).await)
    }

    #[tool(description = "Sign and send a contract method call described by the supplied ABI")]
    async fn write_contract(&self, #[tool(aggr)] request: WriteContractRequest) -> String {
        if let Some(refusal) = self.write_guard() {
            return refusal;
        }
        respond("write contract", self.write(request).await)
    }

    #[tool(description = "Estimate the fee of a contract method call, including the safety margin")]
    async fn estimate_write_contract_fee(
        &self,
        #[tool(aggr)] request: EstimateWriteContractFeeRequest,
    ) -> String {
        respond("estimate contract fee", self.write_fee(request).await)
    }

    #[tool(description = "Call a read method of a standard ERC-20 token")]
    async fn erc20_read(&self, #[tool(aggr)] request: Erc20ReadRequest) -> String {
        let result = match (
            self.network(request.network.as_deref()),
            utils::validate_address(&request.contract_address),
        ) {
            (Ok(context), Ok(token)) => erc20::read(context, token, &request.method, &request.args).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        respond("read ERC-20", result)
    }

    #[tool(description = "Sign and send a write method of a standard ERC-20 token")]
    async fn erc20_write(&self, #[tool(aggr)] request: Erc20WriteRequest) -> String {
        if let Some(refusal) = self.write_guard() {
            return refusal;
        }
        let result = match (
            self.network(request.network.as_deref()),
            utils::validate_address(&request.contract_address),
        ) {
            (Ok(context), Ok(token)) => {
                erc20::write(context, token, &request.method, &request.private_key, &request.args).await
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        respond("write ERC-20", result)
    }

    #[tool(description = "List indexed transactions of an address, optionally for one token contract")]
    async fn get_transactions(&self, #[tool(aggr)] request: TransactionsRequest) -> String {
        let result = async {
            let context = self.network(request.network.as_deref())?;
            let address = utils::validate_address(&request.address)?;
            let token = optional_address(request.contract_address.as_deref())?;
            history::get_transactions(context, address, token).await
        }
        .await;
        respond("get transactions", result)
    }

    #[tool(description = "Get one indexed transaction by id")]
    async fn get_transaction(&self, #[tool(aggr)] request: TransactionLookupRequest) -> String {
        let result = match self.network(request.network.as_deref()) {
            Ok(context) => history::get_transaction(context, &request.transaction_id).await,
            Err(e) => Err(e),
        };
        respond("get transaction", result)
    }

    #[tool(description = "Buy a token listed on the Mirrora marketplace")]
    async fn mirrora_buy(&self, #[tool(aggr)] request: MarketplaceRequest) -> String {
        if let Some(refusal) = self.write_guard() {
            return refusal;
        }
        let result = self
            .marketplace_write(request, |token_id, _| Ok(MarketAction::Buy { token_id }))
            .await;
        respond("buy token", result)
    }

    #[tool(description = "List a token for sale on the Mirrora marketplace")]
    async fn mirrora_start_sale(&self, #[tool(aggr)] request: MarketplaceRequest) -> String {
        if let Some(refusal) = self.write_guard() {
            return refusal;
        }
        let result = self
            .marketplace_write(request, |token_id, price| {
                Ok(MarketAction::StartSale {
                    token_id,
                    price: sale_price(price)?,
                })
            })
            .await;
        respond("start sale", result)
    }

    #[tool(description = "Withdraw a token from sale on the Mirrora marketplace")]
    async fn mirrora_stop_sale(&self, #[tool(aggr)] request: MarketplaceRequest) -> String {
        if let Some(refusal) = self.write_guard() {
            return refusal;
        }
        let result = self
            .marketplace_write(request, |token_id, _| Ok(MarketAction::StopSale { token_id }))
            .await;
        respond("stop sale", result)
    }

    #[tool(description = "Change the price of a token listed on the Mirrora marketplace")]
    async fn mirrora_update_price(&self, #[tool(aggr)] request: MarketplaceRequest) -> String {
        if let Some(refusal) = self.write_guard() {
            return refusal;
        }
        let result = self
            .marketplace_write(request, |token_id, price| {
                Ok(MarketAction::UpdatePrice {
                    token_id,
                    price: sale_price(price)?,
                })
            })
            .await;
        respond("update price", result)
    }

    #[tool(description = "Get owner, price and sale state of a Mirrora marketplace token")]
    async fn mirrora_token_info(&self, #[tool(aggr)] request: MarketplaceTokenRequest) -> String {
        respond("get token info", self.marketplace_token(request).await)
    }

    #[tool(description = "Mint test tokens from the marketplace's payment token")]
    async fn mirrora_mint_token(&self, #[tool(aggr)] request: MintTokenRequest) -> String {
        if let Some(refusal) = self.write_guard() {
            return refusal;
        }
        respond("mint token", self.mint(request).await)
    }

    #[tool(description = "List the contract addresses configured for a network")]
    async fn list_known_contracts(&self, #[tool(aggr)] request: KnownContractsRequest) -> String {
        respond(
            "list known contracts",
            self.known_contracts(request.network.as_deref()),
        )
    }
}

#[tool(tool_box)]
impl ServerHandler for WalletMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("MCP wallet server for EVM chains. Supports mnemonic wallets, key recovery, balances, native and ERC-20 transfers, fee estimation, ABI-driven contract reads and writes, and indexed transaction history, plus the Mirrora marketplace.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::testing::{self, MockChain, RECIPIENT, TEST_ADDRESS, TEST_PRIVATE_KEY};

    fn server(mock: Arc<MockChain>, allow_writes: bool) -> WalletMcpServer {
        let mut config = Config::default();
        config.default_network = "local".to_string();
        config.security.allow_write_operations = allow_writes;
        let providers = ProviderManager::from_contexts(
            "local",
            vec![ChainContext::new("local", testing::network_config(), mock)],
        );
        WalletMcpServer::with_providers(config, providers)
    }

    fn parse(output: &str) -> Value {
        serde_json::from_str(output).unwrap_or_else(|_| panic!("not JSON: {}", output))
    }

    #[tokio::test]
    async fn test_generate_and_restore_wallet() {
        let server = server(Arc::new(MockChain::new()), false);
        let wallet = parse(&server.generate_wallet().await);
        let mnemonic = wallet["mnemonic"].as_str().unwrap().to_string();

        let restored = parse(
            &server
                .restore_from_mnemonic(RestoreFromMnemonicRequest { mnemonic, index: None })
                .await,
        );
        assert_eq!(restored["address"], wallet["address"]);
        assert_eq!(restored["privateKey"], wallet["privateKey"]);

        let recovered = parse(
            &server
                .restore_from_private_key(RestoreFromPrivateKeyRequest {
                    private_key: TEST_PRIVATE_KEY.to_string(),
                })
                .await,
        );
        assert_eq!(recovered["address"], TEST_ADDRESS);
    }

    #[tokio::test]
    async fn test_invalid_mnemonic_is_reported() {
        let server = server(Arc::new(MockChain::new()), false);
        let output = server
            .restore_from_mnemonic(RestoreFromMnemonicRequest {
                mnemonic: "apple banana".to_string(),
                index: Some(0),
            })
            .await;
        assert!(output.starts_with("Error: Key derivation failed"));
    }

    #[tokio::test]
    async fn test_writes_are_gated() {
        let mock = Arc::new(MockChain::new());
        let server = server(mock.clone(), false);
        let output = server
            .transfer(TransferRequest {
                private_key: TEST_PRIVATE_KEY.to_string(),
                to: RECIPIENT.to_string(),
                amount: "1".to_string(),
                contract_address: None,
                network: None,
            })
            .await;
        assert!(output.starts_with("Error: Write operations are disabled"));
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_when_writes_allowed() {
        let mock = Arc::new(MockChain::new());
        let server = server(mock.clone(), true);
        let output = parse(
            &server
                .transfer(TransferRequest {
                    private_key: TEST_PRIVATE_KEY.to_string(),
                    to: RECIPIENT.to_string(),
                    amount: "1000000000000000000".to_string(),
                    contract_address: None,
                    network: None,
                })
                .await,
        );

        let (tx, hash) = mock.single_sent();
        assert_eq!(output["transactionId"], hash.to_string());
        assert_eq!(tx.value.to_string(), "1000000000000000000");
    }

    #[tokio::test]
    async fn test_unknown_network() {
        let server = server(Arc::new(MockChain::new()), false);
        let output = server
            .get_balance(BalanceRequest {
                address: TEST_ADDRESS.to_string(),
                contract_address: None,
                network: Some("mars".to_string()),
            })
            .await;
        assert_eq!(output, "Error: Network 'mars' is not configured");
    }

    #[tokio::test]
    async fn test_fee_estimate_soft_failure() {
        let mock = Arc::new(MockChain::new());
        mock.fail_estimate("execution reverted");
        let server = server(mock, false);
        let output = parse(
            &server
                .estimate_fee(EstimateFeeRequest {
                    from: TEST_ADDRESS.to_string(),
                    to: RECIPIENT.to_string(),
                    value: "1".to_string(),
                    contract_address: None,
                    network: None,
                })
                .await,
        );
        assert_eq!(output["error"], true);
        assert_eq!(output["message"], "Insufficient funds");
    }

    #[tokio::test]
    async fn test_read_contract_tool() {
        let mock = Arc::new(MockChain::new().with_call_result(
            alloy::primitives::U256::from(18u64).to_be_bytes::<32>().to_vec(),
        ));
        let server = server(mock, false);
        let output = server
            .erc20_read(Erc20ReadRequest {
                contract_address: testing::TOKEN.to_string(),
                method: "decimals".to_string(),
                args: vec![],
                network: None,
            })
            .await;
        assert_eq!(parse(&output), json!("18"));
    }

    #[tokio::test]
    async fn test_list_known_contracts_without_entries() {
        let server = server(Arc::new(MockChain::new()), false);
        let output = parse(
            &server
                .list_known_contracts(KnownContractsRequest { network: None })
                .await,
        );
        assert_eq!(output["network"], "local");
        assert_eq!(output["chainId"], 31337);
        assert_eq!(output["contracts"], json!({}));
    }

    fn marketplace_server(mock: Arc<MockChain>) -> WalletMcpServer {
        let mut config = Config::default();
        config.default_network = "local".to_string();
        config.security.allow_write_operations = true;
        config.contracts.insert(
            "local".to_string(),
            [
                (mirrora::MARKETPLACE_LABEL.to_string(), RECIPIENT.to_string()),
                (mirrora::TOKEN_LABEL.to_string(), testing::TOKEN.to_string()),
            ]
            .into_iter()
            .collect(),
        );
        let providers = ProviderManager::from_contexts(
            "local",
            vec![ChainContext::new("local", testing::network_config(), mock)],
        );
        WalletMcpServer::with_providers(config, providers)
    }

    fn sale_request(price: Option<&str>) -> MarketplaceRequest {
        MarketplaceRequest {
            private_key: TEST_PRIVATE_KEY.to_string(),
            token_id: "12".to_string(),
            price: price.map(str::to_string),
            value: None,
            network: None,
        }
    }

    #[tokio::test]
    async fn test_write_fee_with_raw_data() {
        let mock = Arc::new(MockChain::new());
        let server = server(mock.clone(), false);
        let output = parse(
            &server
                .estimate_write_contract_fee(EstimateWriteContractFeeRequest {
                    abi: json!([]),
                    method: "forward".to_string(),
                    contract_address: testing::TOKEN.to_string(),
                    from: TEST_ADDRESS.to_string(),
                    args: vec![],
                    data: Some("0xcafebabe".to_string()),
                    value: None,
                    network: None,
                })
                .await,
        );
        assert_eq!(output["error"], false);
        let requests = mock.estimate_requests();
        assert_eq!(
            requests[0].input.input().map(|data| data.to_vec()),
            Some(vec![0xca, 0xfe, 0xba, 0xbe])
        );
    }

    #[tokio::test]
    async fn test_marketplace_writes_are_gated() {
        let mock = Arc::new(MockChain::new());
        let server = server(mock.clone(), false);
        let output = server.mirrora_buy(sale_request(None)).await;
        assert!(output.starts_with("Error: Write operations are disabled"));
        let output = server
            .mirrora_mint_token(MintTokenRequest {
                private_key: TEST_PRIVATE_KEY.to_string(),
                network: None,
            })
            .await;
        assert!(output.starts_with("Error: Write operations are disabled"));
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_marketplace_start_sale() {
        let mock = Arc::new(MockChain::new());
        let server = marketplace_server(mock.clone());

        let output = server.mirrora_start_sale(sale_request(None)).await;
        assert_eq!(output, "Error: Invalid argument: price is required");
        assert!(mock.sent().is_empty());

        let output = parse(&server.mirrora_start_sale(sale_request(Some("1000"))).await);
        let (tx, hash) = mock.single_sent();
        assert_eq!(output["transactionId"], hash.to_string());
        assert_eq!(
            tx.to,
            alloy::primitives::TxKind::Call(testing::address(RECIPIENT))
        );
    }

    #[tokio::test]
    async fn test_marketplace_needs_configured_contract() {
        let server = server(Arc::new(MockChain::new()), false);
        let output = server
            .mirrora_token_info(MarketplaceTokenRequest {
                token_id: "1".to_string(),
                network: None,
            })
            .await;
        assert_eq!(
            output,
            "Error: Invalid argument: No 'mirrora' contract configured for network 'local'"
        );
    }

    #[tokio::test]
    async fn test_mint_targets_payment_token() {
        let mock = Arc::new(MockChain::new());
        let server = marketplace_server(mock.clone());
        parse(
            &server
                .mirrora_mint_token(MintTokenRequest {
                    private_key: TEST_PRIVATE_KEY.to_string(),
                    network: None,
                })
                .await,
        );
        let (tx, _) = mock.single_sent();
        assert_eq!(
            tx.to,
            alloy::primitives::TxKind::Call(testing::address(testing::TOKEN))
        );
    }
}
